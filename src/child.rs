//! # Handle to the spawned root child.
//!
//! [`ChildHandle`] wraps the OS child with set-once exit bookkeeping: the
//! exit status transitions from unset to set exactly once, and stays
//! observable after the kill domain is released.

use std::io;
use std::process::ExitStatus;

use tokio::process::Child;

/// Opaque reference to the spawned root process.
pub struct ChildHandle {
    pid: u32,
    inner: Child,
    status: Option<ExitStatus>,
}

impl ChildHandle {
    pub(crate) fn new(inner: Child) -> Self {
        let pid = inner.id().unwrap_or(0);
        Self {
            pid,
            inner,
            status: None,
        }
    }

    /// OS process id of the root child.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the OS has reported the child as exited. Monotone.
    pub fn has_exited(&self) -> bool {
        self.status.is_some()
    }

    /// The recorded exit status, once set.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Waits for exit and records the status. Subsequent calls return the
    /// recorded value without touching the OS again.
    pub(crate) async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.inner.wait().await?;
        self.status = Some(status);
        Ok(status)
    }
}

impl std::fmt::Debug for ChildHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildHandle")
            .field("pid", &self.pid)
            .field("status", &self.status)
            .finish()
    }
}
