//! # Observer hook for supervision events.
//!
//! Implement [`Observer`] to receive lifecycle events (logging, metrics,
//! custom sinks). The built-in [`LogObserver`] prints events to stdout and
//! is enabled via the `logging` feature (on by default).
//!
//! ## Output format
//! ```text
//! [spawned] pid=4242
//! [deadline] pid=4242 elapsed=1.001s
//! [term] pid=4242
//! [killed] pid=4242
//! [exited] pid=4242 code=-1
//! [released] pid=4242
//! ```

use async_trait::async_trait;

use crate::events::Event;
#[cfg(feature = "logging")]
use crate::events::EventKind;

/// Hook into supervision lifecycle events.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn on_event(&self, event: &Event);
}

/// Simple stdout logging observer.
///
/// Intended for debugging and the bundled runner. Implement a custom
/// [`Observer`] for structured logging or metrics collection.
#[cfg(feature = "logging")]
pub struct LogObserver;

#[cfg(feature = "logging")]
#[async_trait]
impl Observer for LogObserver {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::Spawned => {
                if let Some(pid) = e.pid {
                    println!("[spawned] pid={pid}");
                }
            }
            EventKind::Exited => {
                println!("[exited] pid={:?} code={:?}", e.pid, e.exit_code);
            }
            EventKind::DeadlineExpired => {
                println!("[deadline] pid={:?} elapsed={:?}", e.pid, e.elapsed);
            }
            EventKind::CancelRequested => {
                println!("[cancelled] pid={:?}", e.pid);
            }
            EventKind::TermSignalled => {
                println!("[term] pid={:?}", e.pid);
            }
            EventKind::ForceKilled => {
                println!("[killed] pid={:?}", e.pid);
            }
            EventKind::Released => {
                println!("[released] pid={:?}", e.pid);
            }
        }
    }
}
