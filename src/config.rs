//! # Global supervisor configuration.
//!
//! [`Config`] defines the termination behavior: the graceful window between
//! the soft and hard kill, the bounded join after the hard kill, and the
//! tuning of the degraded per-process kill path used when no kill-group
//! primitive is available.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use procvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.graceful_wait = Duration::from_millis(250);
//!
//! assert_eq!(cfg.fallback_kill_passes, 5);
//! ```

use std::time::Duration;

/// Global configuration for the supervisor.
///
/// Controls the graceful window, the force-join budget, and the degraded
/// kill path. Immutable for the duration of a run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Window between the graceful signal and the forceful kill.
    pub graceful_wait: Duration,
    /// Bounded wait for the root to be reaped after the forceful kill.
    /// Exceeding it is fatal (`TerminationIncomplete`).
    pub force_join_timeout: Duration,
    /// Number of kill passes in the degraded per-process path. Descendants
    /// can fork between passes; repeating closes that race.
    pub fallback_kill_passes: u32,
    /// Pause between degraded kill passes.
    pub fallback_kill_interval: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `graceful_wait = 500ms`
    /// - `force_join_timeout = 2s`
    /// - `fallback_kill_passes = 5`
    /// - `fallback_kill_interval = 150ms`
    /// - `bus_capacity = 256`
    fn default() -> Self {
        Self {
            graceful_wait: Duration::from_millis(500),
            force_join_timeout: Duration::from_secs(2),
            fallback_kill_passes: 5,
            fallback_kill_interval: Duration::from_millis(150),
            bus_capacity: 256,
        }
    }
}
