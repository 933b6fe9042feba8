//! Per-job workspace materialization.
//!
//! A workspace is the directory `{storage_root}/{job_id}/` holding the four
//! files the compiler reads. The directory name is a fresh v4 UUID, so jobs
//! never share a workspace. Workspaces are not removed here; retention
//! belongs to the storage lifecycle.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::storage::{StorageError, WorkspaceStorage};
use crate::types::JobId;
use crate::validation::rules::PRESET_DECLARATION;
use crate::validation::BuildRequest;

pub const INPUT_CSS: &str = "input.css";
pub const PRESET_JS: &str = "preset.js";
pub const CONTENT_HTML: &str = "content.html";
pub const CONFIG_JS: &str = "tailwind.config.js";

/// Replacement for [`PRESET_DECLARATION`] so the compiler can `require` the
/// preset as a plain module.
pub const MODULE_EXPORTS: &str = "module.exports = {";

/// Plugins every generated config loads.
pub const PLUGINS: [&str; 3] = [
    "@tailwindcss/forms",
    "@tailwindcss/typography",
    "@tailwindcss/line-clamp",
];

/// A workspace file could not be written.
#[derive(Debug, thiserror::Error)]
#[error("Failed to warm up the compiler [{file}].")]
pub struct WorkspaceWriteError {
    pub file: &'static str,
    #[source]
    pub source: StorageError,
}

/// The isolated directory of one job.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id: JobId,
    dir: PathBuf,
}

impl JobWorkspace {
    /// Allocate a new workspace with a fresh job id. Nothing is written yet.
    pub fn allocate(storage: &dyn WorkspaceStorage) -> Self {
        let id = Uuid::new_v4();
        let dir = storage.locate(&id.to_string());
        Self { id, dir }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the four job files in order. Stops at the first failure;
    /// files already written are left in place.
    pub async fn materialize(
        &self,
        storage: &dyn WorkspaceStorage,
        request: &BuildRequest,
    ) -> Result<(), WorkspaceWriteError> {
        let preset = transform_preset(&request.preset);
        let config = render_config(&self.dir);

        let files: [(&'static str, &str); 4] = [
            (INPUT_CSS, &request.css),
            (PRESET_JS, &preset),
            (CONTENT_HTML, &request.content),
            (CONFIG_JS, &config),
        ];

        for (file, contents) in files {
            storage
                .write(&self.key(file), contents.as_bytes())
                .await
                .map_err(|source| {
                    tracing::error!(job_id = %self.id, file, error = %source, "Workspace write failed");
                    WorkspaceWriteError { file, source }
                })?;
        }

        tracing::debug!(job_id = %self.id, dir = %self.dir.display(), "Workspace materialized");
        Ok(())
    }

    fn key(&self, file: &str) -> String {
        format!("{}/{file}", self.id)
    }
}

/// Turn a `tailwind.config = {` preset into a `module.exports = {` module.
///
/// Only the first occurrence is replaced; the rest is kept byte for byte.
pub fn transform_preset(preset: &str) -> String {
    preset.replacen(PRESET_DECLARATION, MODULE_EXPORTS, 1)
}

/// Render the wrapper `tailwind.config.js` for a workspace at `dir`.
pub fn render_config(dir: &Path) -> String {
    let content = js_string(&dir.join(CONTENT_HTML).to_string_lossy());
    let preset = js_string(&dir.join(PRESET_JS).to_string_lossy());

    let mut out = String::from("module.exports = {\n");
    out.push_str(&format!("    content: [{content}],\n"));
    out.push_str(&format!("    presets: [require({preset})],\n"));
    out.push_str("    plugins: [\n");
    for plugin in PLUGINS {
        out.push_str(&format!("        require({}),\n", js_string(plugin)));
    }
    out.push_str("    ],\n};\n");
    out
}

/// Single-quoted JavaScript string literal.
fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
