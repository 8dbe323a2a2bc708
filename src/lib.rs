//! # procvisor
//!
//! **Procvisor** is a concurrent supervisor for externally-spawned child
//! processes, built on the Tokio runtime.
//!
//! It lets a host process launch any number of programs or shell commands,
//! receive asynchronous notifications of their output and exit, and later
//! either wait for all of them to finish (optionally with a timeout) or
//! broadcast termination across the whole set — without blocking its main
//! control flow on any single child.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ProcessSpec  │   │ ProcessSpec  │   │ ProcessSpec  │
//!     │ + callbacks  │   │ + callbacks  │   │ + callbacks  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ProcessSupervisor                                                │
//! │  - children: running set keyed by ChildId (never by pid)          │
//! │  - reaper: wraps each on_exit, deregisters before it runs         │
//! │  - quiescent: waiters notified when the set drains to empty       │
//! │  - Bus: broadcast events (launch/exit/terminate/quiescence)       │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!  ┌────────────┐    ┌────────────┐    ┌────────────┐
//!  │ChildProcess│    │ChildProcess│    │ChildProcess│
//!  │ driver task│    │ driver task│    │ driver task│
//!  └─────┬──────┘    └─────┬──────┘    └─────┬──────┘
//!        │ on_stdout/on_stderr chunks, then exactly one on_exit,
//!        │ each on a runtime worker thread
//!        ▼
//!  caller's callbacks (never concurrent for the same child)
//! ```
//!
//! ## Lifecycle
//! ```text
//! launch_program / launch_command
//!   ├─► spawn the OS process (failure returns synchronously,
//!   │                         nothing is registered)
//!   └─► register the child; its exit callback is wrapped:
//!         1. remove from the running set        (under the lock)
//!         2. invoke the caller's on_exit(code)  (outside the lock)
//!         3. if the set is now empty, wake wait() callers
//!
//! terminate_all: SIGTERM every child running at snapshot time; failures
//!                are published on the event bus and skipped
//! wait(max):     true once the running set is empty; false on timeout
//! ```
//!
//! ## Features
//! | Area             | Description                                           | Key types                               |
//! |------------------|-------------------------------------------------------|-----------------------------------------|
//! | **Launching**    | Direct program or shell command line, spawn options.  | [`ProcessSpec`], [`ProcessOptions`]     |
//! | **Callbacks**    | Output chunks and exit code per child.                | [`ProcessCallbacks`]                    |
//! | **Supervision**  | Registration, reaping, broadcast terminate, wait.     | [`ProcessSupervisor`]                   |
//! | **Stdin**        | Queued writes with optional end-of-input.             | [`ChildProcess::write_stdin`]           |
//! | **Events**       | Side channel for logging/metrics/tests.               | [`Event`], [`EventKind`], [`Subscribe`] |
//! | **Errors**       | Synchronous launch errors, per-child control errors.  | [`LaunchError`], [`ControlError`]       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use procvisor::{ProcessCallbacks, ProcessOptions, ProcessSupervisor, SupervisorConfig};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = ProcessSupervisor::new(SupervisorConfig::default());
//!
//!     sup.launch_command(
//!         "echo one; echo two",
//!         ProcessOptions::default(),
//!         ProcessCallbacks::new()
//!             .on_stdout(|chunk| print!("{}", String::from_utf8_lossy(chunk)))
//!             .on_exit(|code| println!("exited with {code}")),
//!     )?;
//!
//!     if !sup.wait(Some(Duration::from_secs(10))).await {
//!         sup.terminate_all();
//!         sup.wait(None).await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Exit code convention
//! `0` success; non-zero the child's own failure code; `127` "command not
//! found" when launched via the shell; `-(signal number)` when the child was
//! terminated by a signal.

mod config;
mod core;
mod error;
mod events;
mod process;
mod subscribers;

// ---- Public re-exports ----

pub use config::SupervisorConfig;
pub use crate::core::ProcessSupervisor;
pub use error::{ControlError, LaunchError};
pub use events::{Bus, Event, EventKind};
pub use process::{
    ChildId, ChildProcess, ExitFn, OutputFn, ProcessCallbacks, ProcessOptions, ProcessSpec,
};
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
