//! # Unix kill domain: session-leader model.
//!
//! The child calls `setsid(2)` between `fork` and `exec`, becoming a
//! session leader whose PGID equals its PID. Signalling the negated PGID
//! then reaches the child and every descendant it ever forks, including
//! ones that appear mid-termination.
//!
//! When session setup is unavailable the domain degrades to a flat walk of
//! the process table, signalling each descendant individually (leaves
//! first, root last) and repeating the forceful pass because descendants
//! can fork between one pass and the next.

use std::time::Duration;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::child::ChildHandle;
use crate::config::Config;
use crate::domain::KillDomain;
use crate::enumerate::descendants;
use crate::error::SuperviseError;
use crate::request::SpawnRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Child is a session leader; signal the negated PGID.
    Session,
    /// No kill-group primitive; signal each descendant from a table walk.
    Flat,
}

pub(crate) struct UnixKillDomain {
    pid: Option<u32>,
    mode: Mode,
    kill_passes: u32,
    kill_interval: Duration,
}

impl UnixKillDomain {
    pub(crate) fn new(cfg: &Config) -> Self {
        Self {
            pid: None,
            mode: Mode::Session,
            kill_passes: cfg.fallback_kill_passes,
            kill_interval: cfg.fallback_kill_interval,
        }
    }

    fn command(request: &SpawnRequest) -> Command {
        let mut cmd = Command::new(request.program());
        cmd.args(request.argv());
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Signals the whole session via the negated PGID.
    fn signal_group(&self, pid: u32, sig: Signal) -> nix::Result<()> {
        killpg(Pid::from_raw(pid as i32), sig)
    }

    /// One flat pass over the current descendant set, leaves first, root
    /// last. ESRCH means the process won the race by exiting already.
    fn kill_pass(&self, root: u32, sig: Signal) {
        for pid in descendants(root) {
            match kill(Pid::from_raw(pid as i32), sig) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(err) => debug!(pid, %err, "signal to descendant failed"),
            }
        }
        match kill(Pid::from_raw(root as i32), sig) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(err) => debug!(pid = root, %err, "signal to root failed"),
        }
    }
}

#[async_trait]
impl KillDomain for UnixKillDomain {
    async fn spawn_and_attach(
        &mut self,
        request: &SpawnRequest,
    ) -> Result<ChildHandle, SuperviseError> {
        let mut cmd = Self::command(request);
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let handle = match cmd.spawn() {
            Ok(child) => {
                self.mode = Mode::Session;
                ChildHandle::new(child)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SuperviseError::Spawn { source: err });
            }
            Err(err) => {
                // Session setup is the only thing the plain spawn lacks;
                // losing it costs the group primitive, not the run.
                warn!(%err, "session-leader spawn failed; retrying without a session");
                let child = Self::command(request)
                    .spawn()
                    .map_err(|source| SuperviseError::Spawn { source })?;
                self.mode = Mode::Flat;
                ChildHandle::new(child)
            }
        };

        self.pid = Some(handle.pid());
        debug!(pid = handle.pid(), mode = ?self.mode, "child attached");
        Ok(handle)
    }

    async fn signal_terminate(&mut self) {
        let Some(pid) = self.pid else { return };
        match self.mode {
            Mode::Session => match self.signal_group(pid, Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(err) => {
                    warn!(pid, %err, "killpg failed; degrading to per-process signalling");
                    self.mode = Mode::Flat;
                    self.kill_pass(pid, Signal::SIGTERM);
                }
            },
            Mode::Flat => self.kill_pass(pid, Signal::SIGTERM),
        }
    }

    async fn terminate_now(&mut self) {
        let Some(pid) = self.pid else { return };
        if self.mode == Mode::Session {
            match self.signal_group(pid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => return,
                Err(err) => {
                    warn!(pid, %err, "killpg failed; degrading to per-process signalling");
                    self.mode = Mode::Flat;
                }
            }
        }

        // Descendants may fork between passes; repeat until the table is
        // quiet or the pass budget runs out.
        for pass in 0..self.kill_passes.max(1) {
            self.kill_pass(pid, Signal::SIGKILL);
            if pass + 1 == self.kill_passes.max(1) {
                break;
            }
            sleep(self.kill_interval).await;
            if descendants(pid).is_empty() {
                break;
            }
        }
    }

    fn release(&mut self) {
        // The supervisor's wait reaps the zombie; nothing to close here
        // beyond forgetting the group.
        if let Some(pid) = self.pid.take() {
            debug!(pid, "kill domain released");
        }
    }
}
