//! # Notification callbacks for one child process.
//!
//! [`ProcessCallbacks`] bundles the three optional notification slots a
//! caller can attach at launch time:
//! - `on_stdout(chunk)` / `on_stderr(chunk)`: invoked zero or more times with
//!   raw byte chunks as the child produces output;
//! - `on_exit(code)`: invoked exactly once per successfully started child.
//!
//! ## Rules
//! - All callbacks run on runtime worker threads, at unspecified points after
//!   the launch call returns.
//! - Callbacks for the **same** child never run concurrently with each other
//!   (one driver task per child); callbacks for different children may run in
//!   parallel.
//! - All stdout/stderr chunks are delivered before `on_exit` fires.
//! - The supervisor wraps only `on_exit`; the output slots pass through
//!   untouched.

/// Output callback: raw stdout/stderr chunk.
pub type OutputFn = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Exit callback: exit code (negative sentinel for signal termination).
pub type ExitFn = Box<dyn FnOnce(i32) + Send + 'static>;

/// Optional notification slots for one child process.
///
/// ## Example
/// ```rust
/// use procvisor::ProcessCallbacks;
///
/// let mut collected = Vec::new();
/// let callbacks = ProcessCallbacks::new()
///     .on_stdout(move |chunk| collected.extend_from_slice(chunk))
///     .on_exit(|code| assert_eq!(code, 0));
/// assert!(callbacks.has_exit());
/// ```
#[derive(Default)]
pub struct ProcessCallbacks {
    pub(crate) on_stdout: Option<OutputFn>,
    pub(crate) on_stderr: Option<OutputFn>,
    pub(crate) on_exit: Option<ExitFn>,
}

impl ProcessCallbacks {
    /// Creates an empty callback set (every slot is a no-op).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stdout chunk callback.
    pub fn on_stdout(mut self, f: impl FnMut(&[u8]) + Send + 'static) -> Self {
        self.on_stdout = Some(Box::new(f));
        self
    }

    /// Sets the stderr chunk callback.
    pub fn on_stderr(mut self, f: impl FnMut(&[u8]) + Send + 'static) -> Self {
        self.on_stderr = Some(Box::new(f));
        self
    }

    /// Sets the exit callback.
    pub fn on_exit(mut self, f: impl FnOnce(i32) + Send + 'static) -> Self {
        self.on_exit = Some(Box::new(f));
        self
    }

    /// Returns true if an exit callback is attached.
    pub fn has_exit(&self) -> bool {
        self.on_exit.is_some()
    }
}

impl std::fmt::Debug for ProcessCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessCallbacks")
            .field("on_stdout", &self.on_stdout.is_some())
            .field("on_stderr", &self.on_stderr.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_has_no_slots() {
        let callbacks = ProcessCallbacks::new();
        assert!(callbacks.on_stdout.is_none());
        assert!(callbacks.on_stderr.is_none());
        assert!(!callbacks.has_exit());
    }

    #[test]
    fn slots_are_independent() {
        let callbacks = ProcessCallbacks::new().on_stderr(|_| {});
        assert!(callbacks.on_stdout.is_none());
        assert!(callbacks.on_stderr.is_some());
        assert!(!callbacks.has_exit());
    }
}
