//! Tailwind CLI invocation.
//!
//! The compiler is an external binary treated as a black box:
//! `tailwindcss --input input.css --config tailwind.config.js --minify`,
//! run inside the job workspace. Compiled CSS is read from stdout.

mod subprocess;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workspace::{CONFIG_JS, INPUT_CSS};

#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("Compiler binary not found: {0}")]
    NotFound(String),

    #[error("Compiler binary is not executable: {0}")]
    PermissionDenied(String),

    /// The process could not be started.
    #[error("{0}")]
    Spawn(#[source] std::io::Error),

    /// The process ran and exited unsuccessfully.
    #[error("{}", describe_failure(.exit_code, .stderr))]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("The compiler timed out after {elapsed_ms}ms.")]
    Timeout { elapsed_ms: u64 },

    #[error("The compiler wrote more than {limit} bytes to {stream}.")]
    OutputTooLarge { stream: &'static str, limit: usize },

    #[error("I/O error while waiting for the compiler: {0}")]
    Io(#[source] std::io::Error),
}

/// Captured stderr, or a generic line when the compiler printed nothing.
fn describe_failure(exit_code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match exit_code {
        Some(code) => format!("The compiler exited with code {code}."),
        None => "The compiler was terminated by a signal.".to_string(),
    }
}

/// Result of a successful compilation.
#[derive(Debug, Clone)]
pub struct CompilerOutput {
    pub css: String,
    pub duration_ms: u64,
    pub memory_bytes: u64,
}

/// The bundled Tailwind binary plus its invocation policy.
#[derive(Debug, Clone)]
pub struct TailwindCompiler {
    binary: PathBuf,
    version: String,
    timeout: Duration,
}

impl TailwindCompiler {
    pub fn new(binary: impl Into<PathBuf>, version: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            version: version.into(),
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Configured version string, recorded with every telemetry entry.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Command-line arguments, relative to the workspace directory.
    pub fn args() -> [&'static str; 5] {
        ["--input", INPUT_CSS, "--config", CONFIG_JS, "--minify"]
    }

    /// Check that the binary exists and is executable.
    pub async fn preflight(&self) -> Result<(), CompilerError> {
        let display = self.binary.display().to_string();
        let metadata = tokio::fs::metadata(&self.binary)
            .await
            .map_err(|_| CompilerError::NotFound(display.clone()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                return Err(CompilerError::PermissionDenied(format!(
                    "{display} (mode {mode:#o})"
                )));
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;

        Ok(())
    }

    /// Compile the workspace at `workspace_dir`.
    pub async fn compile(&self, workspace_dir: &Path) -> Result<CompilerOutput, CompilerError> {
        let mut cmd = std::process::Command::new(&self.binary);
        cmd.args(Self::args()).current_dir(workspace_dir);

        let finished =
            subprocess::run_bounded(cmd, self.timeout, subprocess::MAX_OUTPUT_BYTES).await?;

        if !finished.status.success() {
            return Err(CompilerError::Failed {
                exit_code: finished.status.code(),
                stderr: String::from_utf8_lossy(&finished.stderr).into_owned(),
            });
        }

        Ok(CompilerOutput {
            css: String::from_utf8_lossy(&finished.stdout).into_owned(),
            duration_ms: subprocess::millis(finished.duration),
            memory_bytes: finished.memory_bytes,
        })
    }
}
