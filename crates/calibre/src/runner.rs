//! Mutual-exclusion execution of calibredb commands.
//!
//! calibredb refuses concurrent access to its own storage, even for reads,
//! so every invocation (queries included) runs under one exclusive lock held
//! for the full lifetime of the child process. No timeout is applied: a hung
//! calibredb hangs the caller.

use crate::cmdline::CommandLine;
use crate::consts;
use crate::error::{ErrorKind, Result};
use std::process::Command;
use std::sync::{Mutex, PoisonError};

/// Captured output of one invocation. Transient; never retained.
#[derive(Debug)]
pub(crate) struct Execution {
    pub stdout: String,
    pub stderr: String,
}

/// Executes calibredb commands one at a time.
///
/// The lock is a scoped guard, so it is released on every exit path: success,
/// non-zero exit, and spawn failure alike. A poisoned lock is recovered
/// rather than propagated; the runner holds no state the panic could have
/// corrupted.
#[derive(Debug, Default)]
pub struct CommandRunner {
    lock: Mutex<()>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }

    /// Run a command to completion and capture both output streams.
    ///
    /// Any stderr returned alongside a zero exit code is logged as a warning
    /// and surfaced in the result; calibredb emits informational text on
    /// stderr even on success.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ExecutableNotFound`] when the process cannot be started.
    /// - [`ErrorKind::Concurrency`] when calibredb reports another calibre
    ///   instance holding the library.
    /// - [`ErrorKind::CommandFailed`] for any other non-zero exit, carrying
    ///   the command, exit code, and both streams.
    pub(crate) fn run(&self, cmd: &CommandLine) -> Result<Execution> {
        tracing::debug!(command = %cmd, "running calibredb");
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let output = match Command::new(cmd.program()).args(cmd.args()).output() {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(error = %err, "failed to start calibredb");
                exn::bail!(ErrorKind::ExecutableNotFound(cmd.program().to_path_buf()));
            },
        };
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            // Exit code is absent when the child died to a signal.
            let exit_code = output.status.code().unwrap_or(-1);
            if consts::CONCURRENCY_ERR.is_match(&stderr) {
                exn::bail!(ErrorKind::Concurrency { command: cmd.to_string(), exit_code });
            }
            exn::bail!(ErrorKind::CommandFailed {
                command: cmd.to_string(),
                exit_code,
                stdout,
                stderr,
            });
        }

        if !stderr.trim().is_empty() {
            tracing::warn!(command = %cmd, %stderr, "calibredb succeeded with output on stderr");
        }
        Ok(Execution { stdout, stderr })
    }
}
