//! # Runtime events published by the supervisor and child drivers.
//!
//! Events are the supervisor's side channel: launches, exits, termination
//! requests/failures and quiescence are all reported here instead of being
//! returned to (or thrown at) the caller. Subscribers consume them for
//! logging, metrics, or test assertions.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
