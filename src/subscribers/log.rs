//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [launched] program=/bin/echo pid=4242
//! [exited] program=/bin/echo code=0
//! [terminate-requested] program=sleep pid=4243
//! [terminate-failed] program=sleep reason="child process is not running"
//! [quiescent]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, event: &Event) {
        let program = event.program.as_deref().unwrap_or("?");
        match event.kind {
            EventKind::ProcessLaunched => {
                if let Some(pid) = event.pid {
                    println!("[launched] program={program} pid={pid}");
                } else {
                    println!("[launched] program={program}");
                }
            }
            EventKind::ProcessExited => {
                println!("[exited] program={program} code={:?}", event.code);
            }
            EventKind::TerminateRequested => {
                println!("[terminate-requested] program={program} pid={:?}", event.pid);
            }
            EventKind::TerminateFailed => {
                println!(
                    "[terminate-failed] program={program} reason={:?}",
                    event.reason
                );
            }
            EventKind::QuiescenceReached => {
                println!("[quiescent]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
