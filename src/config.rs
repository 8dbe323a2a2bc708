//! # Global supervisor configuration.
//!
//! [`SupervisorConfig`] centralizes runtime settings that are not tied to any
//! single child process. Per-child spawn parameters live in
//! [`ProcessOptions`](crate::ProcessOptions) instead.

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
/// - `kill_grace`: advisory grace between a termination request and when a
///   caller should give up waiting (`0s` = caller decides)
///
/// All fields are public for flexibility.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// will skip older items.
    pub bus_capacity: usize,

    /// Suggested wait budget after [`terminate_all`] before escalating.
    ///
    /// The supervisor never kills on its own; this value is a default for
    /// callers that follow the terminate-then-wait pattern.
    ///
    /// [`terminate_all`]: crate::ProcessSupervisor::terminate_all
    pub kill_grace: Duration,
}

impl Default for SupervisorConfig {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    /// - `kill_grace = 5s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            kill_grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.bus_capacity, 1024);
        assert_eq!(cfg.kill_grace, Duration::from_secs(5));
    }
}
