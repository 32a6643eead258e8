//! # Supervision lifecycle events.
//!
//! Events flow from the supervisor through the [`Bus`] to registered
//! [`Observer`](crate::Observer)s. They exist for observability only; the
//! state machine never depends on them.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
