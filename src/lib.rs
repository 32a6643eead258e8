//! # procvisor
//!
//! **Procvisor** supervises a child process *and every process it
//! transitively spawns*. It launches the child inside a platform kill
//! group, waits up to a deadline, then guarantees the whole tree is gone
//! before returning: graceful first, forceful when it must.
//!
//! ## Features
//!
//! | Area              | Description                                                       | Key types / traits                 |
//! |-------------------|-------------------------------------------------------------------|------------------------------------|
//! | **Supervision**   | Deadline-driven spawn → wait → escalate → release lifecycle.      | [`Supervisor`], [`Outcome`]        |
//! | **Kill domains**  | POSIX session on Unix, Job Object on Windows, fallbacks included. | (internal, selected per platform)  |
//! | **Observer API**  | Hook into lifecycle events (logging, metrics, custom sinks).      | [`Observer`], [`Event`]            |
//! | **Verification**  | Post-mortem survivor probe keyed by a command-line tag.           | [`count_by_tag`], [`any_left`]     |
//! | **Diagnostics**   | Read-only descendant walk over the OS process table.              | [`descendants`]                    |
//! | **Errors**        | Typed errors for the supervision lifecycle.                       | [`SuperviseError`]                 |
//!
//! ## Optional features
//! - `logging` *(default)*: exports the built-in [`LogObserver`].
//!
//! ```no_run
//! use std::time::Duration;
//! use procvisor::{Config, SpawnRequest, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.graceful_wait = Duration::from_millis(500);
//!
//!     let sup = Supervisor::new(cfg, Vec::new());
//!     let req = SpawnRequest::new("my-worker")
//!         .arg("--jobs")
//!         .arg("4");
//!
//!     let outcome = sup.run_with_timeout(req, Duration::from_secs(5)).await?;
//!     if outcome.timed_out {
//!         println!("tree terminated after the deadline (escalated: {})", outcome.escalated);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ---

mod child;
mod config;
mod domain;
mod enumerate;
mod error;
mod events;
mod observer;
mod outcome;
mod probe;
mod request;
mod supervisor;

// ---- Public re-exports ----

pub use child::ChildHandle;
pub use config::Config;
pub use enumerate::descendants;
pub use error::SuperviseError;
pub use events::{Bus, Event, EventKind};
pub use observer::Observer;
pub use outcome::Outcome;
pub use probe::{any_left, count_by_tag, TAG_MARKER};
pub use request::SpawnRequest;
pub use supervisor::Supervisor;

// Optional: built-in stdout observer (debugging and the bundled runner).
// Enabled by default; disable with `--no-default-features`.
#[cfg(feature = "logging")]
pub use observer::LogObserver;
