//! Error types used by the procvisor runtime.
//!
//! This module defines two main error enums:
//!
//! - [`LaunchError`] — a child process could not be started; surfaced
//!   synchronously from the launch call, before the child is registered.
//! - [`ControlError`] — a control operation (terminate, stdin write) on an
//!   already-running or already-exited child failed.
//!
//! Both types provide `as_label` helpers that return short stable snake_case
//! labels for logging/metrics.
//!
//! A child that starts successfully but exits with a non-zero code is **not**
//! an error of the supervisor; the code is delivered verbatim through the
//! `on_exit` callback.

use thiserror::Error;

/// # Errors produced while starting a child process.
///
/// Launch failures are synchronous: when a launch call returns one of these,
/// the child was never registered with the supervisor and none of the
/// caller's callbacks will ever be invoked for it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The spawn system call failed (executable missing, permission denied, ...).
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program path or shell command line that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process spawned but the runtime did not report a pid for it.
    #[error("spawned `{program}` but no pid was reported")]
    NoPid {
        /// Program path or shell command line.
        program: String,
    },

    /// `run` was called on a child handle that was already started.
    #[error("child process already started")]
    AlreadyStarted,
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::LaunchError;
    ///
    /// let err = LaunchError::AlreadyStarted;
    /// assert_eq!(err.as_label(), "launch_already_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::Spawn { .. } => "launch_spawn_failed",
            LaunchError::NoPid { .. } => "launch_no_pid",
            LaunchError::AlreadyStarted => "launch_already_started",
        }
    }
}

/// # Errors produced by control operations on a child process.
///
/// These are best-effort failures: during [`terminate_all`] they are reported
/// on the event bus and skipped, never surfaced to the original caller.
///
/// [`terminate_all`]: crate::ProcessSupervisor::terminate_all
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ControlError {
    /// The child was never started, or its exit has already been observed.
    #[error("child process is not running")]
    NotRunning,

    /// Signal delivery failed.
    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        /// Target process id.
        pid: i32,
        /// Underlying errno.
        #[source]
        source: nix::Error,
    },

    /// The stdin pipe is closed (never opened, already shut down, or the
    /// child exited).
    #[error("stdin pipe is closed")]
    StdinClosed,
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::NotRunning => "control_not_running",
            ControlError::Signal { .. } => "control_signal_failed",
            ControlError::StdinClosed => "control_stdin_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_labels_are_stable() {
        let err = LaunchError::Spawn {
            program: "/bin/missing".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.as_label(), "launch_spawn_failed");
        assert!(err.to_string().contains("/bin/missing"));
    }

    #[test]
    fn control_labels_are_stable() {
        assert_eq!(ControlError::NotRunning.as_label(), "control_not_running");
        assert_eq!(ControlError::StdinClosed.as_label(), "control_stdin_closed");
    }
}
