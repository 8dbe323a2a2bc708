//! Runtime core: the process supervisor.
//!
//! The only public API from this module is [`ProcessSupervisor`], which owns
//! the collection of currently-running children and provides launch,
//! broadcast termination, and quiescence waiting across the whole set.

mod supervisor;

pub use supervisor::ProcessSupervisor;
