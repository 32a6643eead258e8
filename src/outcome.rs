//! # Per-run supervision report.

use std::time::Duration;

/// What happened to one supervised run.
///
/// Produced by [`Supervisor::run_with_timeout`](crate::Supervisor::run_with_timeout)
/// on every non-error path, including deadline kills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Exit code reported by the root child. `-1` when the OS reported no
    /// code (signal-killed on Unix).
    pub exit_code: i32,
    /// Wall clock from spawn to join.
    pub elapsed: Duration,
    /// Time actually spent waiting between the graceful and forceful kills.
    /// Zero on natural exit.
    pub graceful_window_used: Duration,
    /// The deadline (or an external cancellation) fired before the child
    /// exited on its own.
    pub timed_out: bool,
    /// The graceful window was exhausted and the forceful kill ran.
    pub escalated: bool,
}
