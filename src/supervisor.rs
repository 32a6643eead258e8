//! # Supervisor: deadline-driven lifecycle for one process tree.
//!
//! The [`Supervisor`] owns a platform kill domain per run and drives the
//! spawned tree from launch to guaranteed termination:
//!
//! ```text
//! SpawnRequest ──► run_with_timeout()
//!                        │
//!                   spawn_and_attach (child joins the kill domain)
//!                        │
//!                      WAITING ──── child exits ────────────► RELEASE
//!                        │ deadline / cancellation
//!                        ▼
//!                  KILLING_GRACEFUL (soft kill, grace window)
//!                        │ window exhausted / cancellation
//!                        ▼
//!                  KILLING_FORCE (hard kill, bounded join) ──► RELEASE
//! ```
//!
//! ## Rules
//! - The kill domain is released in **exactly one place**, on scope exit;
//!   a guard makes that hold for error returns and panics too.
//! - Signalling is **best-effort**: a failed soft kill followed by a
//!   successful hard kill is not an error. Only an unreachable child after
//!   the hard kill is fatal.
//! - A failed wait primitive escalates **straight to the hard kill**.
//! - Cancellation during WAITING behaves like the deadline firing now;
//!   during the grace window it collapses the rest of the window; once the
//!   hard kill has started it is ignored.
//! - One run at a time per instance; concurrent calls get [`SuperviseError::Busy`].
//!   Sequential reuse is fine.
//!
//! ```no_run
//! use std::time::Duration;
//! use procvisor::{Config, SpawnRequest, Supervisor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sup = Supervisor::new(Config::default(), Vec::new());
//! let req = SpawnRequest::new("sleep").arg("0.2");
//!
//! let outcome = sup.run_with_timeout(req, Duration::from_secs(2)).await?;
//! assert!(!outcome.timed_out);
//! # Ok(())
//! # }
//! ```

use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::child::ChildHandle;
use crate::config::Config;
use crate::domain::{self, KillDomain, NativeKillDomain};
use crate::error::SuperviseError;
use crate::events::{Bus, Event, EventKind};
use crate::observer::Observer;
use crate::outcome::Outcome;
use crate::request::SpawnRequest;

/// Drives one supervised process tree per run.
///
/// Owns the event bus, the observer fan-out, and (per run) the platform
/// kill domain. Nothing outside the supervisor ever signals the child.
pub struct Supervisor {
    /// Termination tuning.
    cfg: Config,
    /// Event bus shared with observers.
    bus: Bus,
    /// Fan-out targets for lifecycle events.
    observers: Arc<Vec<Arc<dyn Observer>>>,
    /// Guards against concurrent runs on one instance.
    busy: AtomicBool,
    /// Whether the observer listener task has been spawned.
    listener_started: AtomicBool,
}

/// What woke the supervisor out of WAITING.
enum Wake {
    Exited(ExitStatus),
    WaitFailed(io::Error),
    Deadline,
    Cancelled,
}

/// Releases the kill domain even when the run unwinds.
struct DomainGuard {
    inner: NativeKillDomain,
}

impl Drop for DomainGuard {
    fn drop(&mut self) {
        self.inner.release();
    }
}

/// Frees the busy slot when the run ends, however it ends.
struct RunSlot<'a>(&'a AtomicBool);

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Supervisor {
    /// Creates a new supervisor with the given config and observers
    /// (maybe empty).
    pub fn new(cfg: Config, observers: Vec<Arc<dyn Observer>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        Self {
            cfg,
            bus,
            observers: Arc::new(observers),
            busy: AtomicBool::new(false),
            listener_started: AtomicBool::new(false),
        }
    }

    /// Supervises one process tree with a hard deadline.
    ///
    /// Spawns the request inside a fresh kill domain, waits up to `deadline`
    /// for a natural exit, then escalates: soft kill, grace window, hard
    /// kill, bounded join. On return (success or error) the domain holds
    /// no OS handles.
    pub async fn run_with_timeout(
        &self,
        request: SpawnRequest,
        deadline: Duration,
    ) -> Result<Outcome, SuperviseError> {
        self.run_cancellable(request, deadline, CancellationToken::new())
            .await
    }

    /// Like [`run_with_timeout`](Self::run_with_timeout), with an external
    /// cancellation token that behaves like the deadline firing early.
    pub async fn run_cancellable(
        &self,
        request: SpawnRequest,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> Result<Outcome, SuperviseError> {
        if deadline.is_zero() {
            return Err(SuperviseError::InvalidTimeout { timeout: deadline });
        }
        if request.program().is_empty() {
            return Err(SuperviseError::EmptyProgram);
        }
        let _slot = self.acquire_slot()?;
        self.ensure_listener();

        let mut domain = DomainGuard {
            inner: domain::native(&self.cfg),
        };
        let started = Instant::now();
        let mut child = domain.inner.spawn_and_attach(&request).await?;
        let pid = child.pid();
        self.bus.publish(Event::now(EventKind::Spawned).with_pid(pid));

        let result = self
            .drive(&mut domain.inner, &mut child, started, deadline, &cancel)
            .await;

        // The one release site; the guard's Drop only backstops panics.
        domain.inner.release();
        self.bus.publish(Event::now(EventKind::Released).with_pid(pid));
        result
    }

    /// Subscribes to the lifecycle event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// WAITING and everything after it, up to (not including) release.
    async fn drive(
        &self,
        domain: &mut NativeKillDomain,
        child: &mut ChildHandle,
        started: Instant,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Outcome, SuperviseError> {
        let pid = child.pid();

        let wake = tokio::select! {
            res = timeout(deadline, child.wait()) => match res {
                Ok(Ok(status)) => Wake::Exited(status),
                Ok(Err(err)) => Wake::WaitFailed(err),
                Err(_) => Wake::Deadline,
            },
            () = cancel.cancelled() => Wake::Cancelled,
        };

        let via_cancel = match wake {
            Wake::Exited(status) => {
                let code = exit_code_of(status);
                self.bus
                    .publish(Event::now(EventKind::Exited).with_pid(pid).with_exit_code(code));
                return Ok(Outcome {
                    exit_code: code,
                    elapsed: started.elapsed(),
                    graceful_window_used: Duration::ZERO,
                    timed_out: false,
                    escalated: false,
                });
            }
            Wake::WaitFailed(err) => {
                warn!(pid, %err, "wait primitive failed; escalating to forceful kill");
                return self
                    .force(domain, child, started, Duration::ZERO, false)
                    .await;
            }
            Wake::Deadline => {
                self.bus.publish(
                    Event::now(EventKind::DeadlineExpired)
                        .with_pid(pid)
                        .with_elapsed(started.elapsed()),
                );
                false
            }
            Wake::Cancelled => {
                self.bus
                    .publish(Event::now(EventKind::CancelRequested).with_pid(pid));
                true
            }
        };

        // KILLING_GRACEFUL
        domain.signal_terminate().await;
        self.bus
            .publish(Event::now(EventKind::TermSignalled).with_pid(pid));

        let grace_started = Instant::now();
        let graced = tokio::select! {
            res = timeout(self.cfg.graceful_wait, child.wait()) => res.ok(),
            // A cancellation that triggered the kill already spent itself;
            // only a fresh one collapses the window.
            () = cancel.cancelled(), if !via_cancel => None,
        };
        let graceful_window_used = grace_started.elapsed();

        match graced {
            Some(Ok(status)) => {
                let code = exit_code_of(status);
                self.bus
                    .publish(Event::now(EventKind::Exited).with_pid(pid).with_exit_code(code));
                Ok(Outcome {
                    exit_code: code,
                    elapsed: started.elapsed(),
                    graceful_window_used,
                    timed_out: true,
                    escalated: false,
                })
            }
            Some(Err(err)) => {
                warn!(pid, %err, "wait failed during grace window");
                self.force(domain, child, started, graceful_window_used, true)
                    .await
            }
            None => {
                self.force(domain, child, started, graceful_window_used, true)
                    .await
            }
        }
    }

    /// KILLING_FORCE: hard kill, then a bounded join. Cancellation no
    /// longer has any effect here.
    async fn force(
        &self,
        domain: &mut NativeKillDomain,
        child: &mut ChildHandle,
        started: Instant,
        graceful_window_used: Duration,
        timed_out: bool,
    ) -> Result<Outcome, SuperviseError> {
        let pid = child.pid();
        domain.terminate_now().await;
        self.bus
            .publish(Event::now(EventKind::ForceKilled).with_pid(pid));

        match timeout(self.cfg.force_join_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let code = exit_code_of(status);
                self.bus
                    .publish(Event::now(EventKind::Exited).with_pid(pid).with_exit_code(code));
                Ok(Outcome {
                    exit_code: code,
                    elapsed: started.elapsed(),
                    graceful_window_used,
                    timed_out,
                    escalated: true,
                })
            }
            Ok(Err(err)) => {
                warn!(pid, %err, "wait failed after forceful kill");
                Err(SuperviseError::TerminationIncomplete {
                    waited: self.cfg.force_join_timeout,
                })
            }
            Err(_) => Err(SuperviseError::TerminationIncomplete {
                waited: self.cfg.force_join_timeout,
            }),
        }
    }

    fn acquire_slot(&self) -> Result<RunSlot<'_>, SuperviseError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(RunSlot(&self.busy))
        } else {
            Err(SuperviseError::Busy)
        }
    }

    /// Spawns the background task that fans bus events out to observers.
    /// Runs until the supervisor (and with it the bus sender) is dropped.
    fn ensure_listener(&self) {
        if self.observers.is_empty() || self.listener_started.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut rx = self.bus.subscribe();
        let observers = Arc::clone(&self.observers);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        for obs in observers.iter() {
                            obs.on_event(&ev).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_timeout_is_rejected_before_spawn() {
        let sup = Supervisor::new(Config::default(), Vec::new());
        let err = sup
            .run_with_timeout(SpawnRequest::new("sleep").arg("1"), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, SuperviseError::InvalidTimeout { .. }));
    }

    #[tokio::test]
    async fn empty_program_is_rejected_before_spawn() {
        let sup = Supervisor::new(Config::default(), Vec::new());
        let err = sup
            .run_with_timeout(SpawnRequest::new(""), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SuperviseError::EmptyProgram));
    }

    #[tokio::test]
    async fn missing_program_surfaces_spawn_error() {
        let sup = Supervisor::new(Config::default(), Vec::new());
        let err = sup
            .run_with_timeout(
                SpawnRequest::new("definitely-not-a-real-binary-7a1f"),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SuperviseError::Spawn { .. }));
    }
}
