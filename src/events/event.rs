//! # Runtime events emitted by the supervisor and per-child drivers.
//!
//! The [`EventKind`] enum classifies event types:
//! - **Lifecycle events**: a child was launched or exited
//! - **Termination events**: a termination request was issued or failed
//! - **Quiescence events**: the running set became empty
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! the program name, pid, exit code, and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use procvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ProcessExited)
//!     .with_program("cat")
//!     .with_code(0);
//!
//! assert_eq!(ev.kind, EventKind::ProcessExited);
//! assert_eq!(ev.program.as_deref(), Some("cat"));
//! assert_eq!(ev.code, Some(0));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// A child process was spawned and registered.
    ///
    /// Sets:
    /// - `program`: program path or shell command line
    /// - `pid`: OS process id (absent in the rare case the child exited
    ///   before the launch call finished registering it)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ProcessLaunched,

    /// A child process exited and was removed from the running set.
    ///
    /// Sets:
    /// - `program`: program path or shell command line
    /// - `code`: exit code (negative sentinel for signal-terminated children)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ProcessExited,

    // === Termination events ===
    /// A termination request was issued to one child.
    ///
    /// Sets:
    /// - `program`: program path or shell command line
    /// - `pid`: OS process id, if the child is still running
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TerminateRequested,

    /// A termination request for one child failed; the child is skipped and
    /// the remaining children are still signaled.
    ///
    /// Sets:
    /// - `program`: program path or shell command line
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TerminateFailed,

    // === Quiescence events ===
    /// The running set became empty; waiters were notified.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    QuiescenceReached,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Event classification.
    pub kind: EventKind,
    /// Program path or shell command line, if applicable.
    pub program: Option<Arc<str>>,
    /// OS process id, if known at emit time.
    pub pid: Option<u32>,
    /// Exit code reported by the child.
    pub code: Option<i32>,
    /// Human-readable reason (termination failures etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            program: None,
            pid: None,
            code: None,
            reason: None,
        }
    }

    /// Attaches a program name (path or shell command line).
    #[inline]
    pub fn with_program(mut self, program: impl Into<Arc<str>>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Attaches an OS process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
