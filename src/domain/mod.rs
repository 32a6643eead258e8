//! # Platform kill-group primitive.
//!
//! A [`KillDomain`] groups the root child and every process it transitively
//! spawns into a single kill target: a POSIX session on Unix, a Job Object
//! on Windows. Each platform selects its strongest available primitive when
//! the domain is constructed; callers never probe capabilities.
//!
//! Exactly one child is ever attached to a domain, and exactly one
//! supervisor drives it at a time.

use async_trait::async_trait;

use crate::child::ChildHandle;
use crate::config::Config;
use crate::error::SuperviseError;
use crate::request::SpawnRequest;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::UnixKillDomain as NativeKillDomain;
#[cfg(windows)]
pub(crate) use windows::WindowsKillDomain as NativeKillDomain;

/// The kill-group capability: spawn inside the group, signal it softly,
/// kill it hard, release the handles.
#[async_trait]
pub(crate) trait KillDomain: Send {
    /// Spawns the root child inside the kill group and attaches it.
    ///
    /// Group membership is established before any descendant can exist:
    /// in-process before `exec` on Unix, immediately after spawn on
    /// Windows. Setup failures after a successful spawn degrade the domain
    /// to best-effort mode instead of surfacing.
    async fn spawn_and_attach(
        &mut self,
        request: &SpawnRequest,
    ) -> Result<ChildHandle, SuperviseError>;

    /// Best-effort graceful termination of the whole group. Errors are
    /// logged, never returned; the child's observed exit is authoritative.
    async fn signal_terminate(&mut self);

    /// Best-effort forceful termination of the whole group.
    async fn terminate_now(&mut self);

    /// Releases all OS handles owned by the domain. Idempotent, never
    /// fails.
    fn release(&mut self);
}

/// Builds the strongest kill domain this platform offers.
pub(crate) fn native(cfg: &Config) -> NativeKillDomain {
    NativeKillDomain::new(cfg)
}
