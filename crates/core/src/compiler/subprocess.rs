//! Bounded subprocess execution.
//!
//! [`run_bounded`] spawns a command in its own process group and captures
//! stdout/stderr. The whole run, including draining both pipes, must finish
//! within the timeout. The process group is killed when the run ends for any
//! reason, so neither a timeout nor an abandoned request leaves compiler
//! processes behind.
//!
//! The child is reaped with `wait4` on its own pid, which yields the peak
//! RSS of that child (and its reaped descendants) rather than a
//! process-wide high-water mark.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use super::CompilerError;

/// Maximum stdout or stderr size captured per stream (10 MiB).
pub(crate) const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Raw result of a finished child process.
#[derive(Debug)]
pub(crate) struct Finished {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    /// Peak resident set size of the child, in bytes.
    pub memory_bytes: u64,
}

/// Spawn `cmd`, wait at most `timeout`, and capture its output.
///
/// The caller sets program, arguments and working directory. Either stream
/// exceeding `max_output` bytes ends the run with
/// [`CompilerError::OutputTooLarge`].
pub(crate) async fn run_bounded(
    mut cmd: Command,
    timeout: Duration,
    max_output: usize,
) -> Result<Finished, CompilerError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(CompilerError::Spawn)?;
    // Armed for the whole run: on success it clears stragglers that outlived
    // the direct child, on timeout or drop it takes the group down.
    let _group = ProcessGroupGuard::new(child.id());

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_task = tokio::task::spawn_blocking(move || read_capped(stdout, "stdout", max_output));
    let stderr_task = tokio::task::spawn_blocking(move || read_capped(stderr, "stderr", max_output));
    let wait_task = tokio::task::spawn_blocking(move || wait_with_peak_rss(child));

    let run = async {
        tokio::try_join!(
            flatten(wait_task),
            flatten(stdout_task),
            flatten(stderr_task),
        )
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(((status, memory_bytes), stdout, stderr))) => Ok(Finished {
            status,
            stdout,
            stderr,
            duration: start.elapsed(),
            memory_bytes,
        }),
        Ok(Err(e)) => Err(e),
        Err(_elapsed) => Err(CompilerError::Timeout {
            elapsed_ms: millis(start.elapsed()),
        }),
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn flatten<T>(
    task: tokio::task::JoinHandle<Result<T, CompilerError>>,
) -> Result<T, CompilerError> {
    task.await
        .map_err(|e| CompilerError::Io(io::Error::other(e)))?
}

/// Read an entire output stream, failing once it exceeds `max` bytes.
fn read_capped<R: Read>(
    handle: Option<R>,
    stream: &'static str,
    max: usize,
) -> Result<Vec<u8>, CompilerError> {
    let mut buf = Vec::new();
    let Some(h) = handle else {
        return Ok(buf);
    };

    let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
    h.take(limit)
        .read_to_end(&mut buf)
        .map_err(CompilerError::Io)?;

    if buf.len() > max {
        return Err(CompilerError::OutputTooLarge { stream, limit: max });
    }
    Ok(buf)
}

/// Reap `child` and report its exit status and peak RSS in bytes.
#[cfg(unix)]
fn wait_with_peak_rss(child: Child) -> Result<(ExitStatus, u64), CompilerError> {
    use std::mem::MaybeUninit;
    use std::os::unix::process::ExitStatusExt;

    let pid = libc::pid_t::try_from(child.id())
        .map_err(|_| CompilerError::Io(io::Error::other("child pid out of range")))?;

    let mut status: libc::c_int = 0;
    let mut usage = MaybeUninit::<libc::rusage>::zeroed();
    loop {
        // Safety: both out-pointers are valid for writes for the whole call.
        let ret = unsafe { libc::wait4(pid, &mut status, 0, usage.as_mut_ptr()) };
        if ret == pid {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(CompilerError::Io(err));
        }
    }
    // Safety: zero-initialised, and wait4 filled it on success.
    let usage = unsafe { usage.assume_init() };

    Ok((ExitStatus::from_raw(status), max_rss_bytes(usage.ru_maxrss)))
}

#[cfg(not(unix))]
fn wait_with_peak_rss(mut child: Child) -> Result<(ExitStatus, u64), CompilerError> {
    let status = child.wait().map_err(CompilerError::Io)?;
    Ok((status, 0))
}

/// `ru_maxrss` in bytes. macOS reports bytes, Linux and the BSDs KiB.
#[cfg(unix)]
fn max_rss_bytes(max_rss: libc::c_long) -> u64 {
    let max_rss = u64::try_from(max_rss).unwrap_or(0);
    if cfg!(target_os = "macos") {
        max_rss
    } else {
        max_rss.saturating_mul(1024)
    }
}

/// SIGKILLs the child's process group on drop.
struct ProcessGroupGuard {
    pgid: u32,
}

impl ProcessGroupGuard {
    fn new(pgid: u32) -> Self {
        Self { pgid }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Ok(pgid) = i32::try_from(self.pgid) {
            // Safety: kill(2) has no memory-safety preconditions; a negative
            // pid addresses the process group created by `process_group(0)`.
            let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
            if ret == 0 {
                tracing::warn!(pgid, "Killed compiler process group");
            }
        }
    }
}
