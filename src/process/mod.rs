//! # Child process surface: specs, options, callbacks, and the async child.
//!
//! This module contains everything that describes and drives a single child
//! process:
//! - [`ProcessSpec`]: what to launch (program + args, or a shell command line)
//! - [`ProcessOptions`]: how to launch it (cwd, env, stdio wiring, detach)
//! - [`ProcessCallbacks`]: stdout/stderr/exit notification slots
//! - [`ChildProcess`]: one spawned process with its I/O driver
//!
//! [`ChildProcess`] is usable standalone; the
//! [`ProcessSupervisor`](crate::ProcessSupervisor) builds on it for
//! collection-level operations.

mod callbacks;
mod child;
mod spec;

pub use callbacks::{ExitFn, OutputFn, ProcessCallbacks};
pub use child::{ChildId, ChildProcess};
pub use spec::{ProcessOptions, ProcessSpec};
