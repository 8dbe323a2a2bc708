//! # Core subscriber trait.
//!
//! `Subscribe` is the extension point for plugging custom event handlers
//! into the runtime. Subscribers are driven sequentially by one listener
//! task owned by the supervisor.
//!
//! ## Contract
//! - Handlers run off the hot path: publishing never waits for them.
//! - A slow handler delays later events for **all** subscribers of the same
//!   supervisor; if the listener falls more than the bus capacity behind,
//!   older events are skipped.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from the supervisor's listener task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
