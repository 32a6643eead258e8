//! # Error types used by the supervisor.
//!
//! A single enum, [`SuperviseError`], covers everything that can stop a
//! supervision run from making progress. Failures while *signalling* a
//! process group are deliberately not represented here: signalling is
//! best-effort and the authoritative outcome is the child's observed exit,
//! so those errors are logged by the platform domains and swallowed.
//!
//! Provides the helper method `as_label` for logs/metrics.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that stop a supervision run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SuperviseError {
    /// The deadline must be finite and strictly positive.
    #[error("timeout must be positive, got {timeout:?}")]
    InvalidTimeout {
        /// The rejected deadline value.
        timeout: Duration,
    },

    /// The request named no executable.
    #[error("spawn request has an empty program")]
    EmptyProgram,

    /// Another run is already in flight on this supervisor instance.
    #[error("supervisor is busy with another run")]
    Busy,

    /// The OS refused to create the root child.
    #[error("failed to spawn child: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },

    /// The root child was never observed as exited after forceful kill
    /// plus the bounded join window.
    #[error("child still not reaped {waited:?} after forceful kill")]
    TerminationIncomplete {
        /// How long the supervisor waited after the forceful kill.
        waited: Duration,
    },
}

impl SuperviseError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SuperviseError::InvalidTimeout { .. } => "invalid_timeout",
            SuperviseError::EmptyProgram => "empty_program",
            SuperviseError::Busy => "busy",
            SuperviseError::Spawn { .. } => "spawn_failed",
            SuperviseError::TerminationIncomplete { .. } => "termination_incomplete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let e = SuperviseError::InvalidTimeout {
            timeout: Duration::ZERO,
        };
        assert_eq!(e.as_label(), "invalid_timeout");
        assert_eq!(SuperviseError::Busy.as_label(), "busy");
        assert_eq!(
            SuperviseError::TerminationIncomplete {
                waited: Duration::from_secs(2)
            }
            .as_label(),
            "termination_incomplete"
        );
    }

    #[test]
    fn spawn_error_keeps_os_reason() {
        let e = SuperviseError::Spawn {
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(e.to_string().contains("failed to spawn"));
    }
}
