//! # Event subscribers for the procvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and a built-in stdout
//! logger for handling runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   child driver ── publish(Event) ──► Bus ──► supervisor listener task
//!   reaper       ──┘                              │
//!                                       ┌─────────┼─────────┐
//!                                       ▼         ▼         ▼
//!                                    LogWriter  Metrics   Custom ...
//!                                    (feature   (user)    (user)
//!                                     logging)
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use procvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct ExitCounter;
//!
//! #[async_trait]
//! impl Subscribe for ExitCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ProcessExited {
//!             // increment a counter...
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
