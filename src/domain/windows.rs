//! # Windows kill domain: Job Object model.
//!
//! The child is assigned to a Job Object configured with
//! `JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE`: when the last job handle closes,
//! the OS terminates every process in the job, current and future. Closing
//! the handle therefore serves as the soft step and `TerminateJobObject`
//! as the hard step, preserving the graceful→forceful escalation contract
//! even though Windows has no SIGTERM/SIGKILL distinction at the job
//! layer.
//!
//! The child is assigned to the job immediately after spawn rather than
//! created suspended; a descendant spawned in that window is only caught
//! by the `taskkill /T` fallback.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::JobObjects::{
    AssignProcessToJobObject, CreateJobObjectW, SetInformationJobObject, TerminateJobObject,
    JobObjectExtendedLimitInformation, JOBOBJECT_EXTENDED_LIMIT_INFORMATION,
    JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_SET_QUOTA, PROCESS_TERMINATE};

use crate::child::ChildHandle;
use crate::config::Config;
use crate::domain::KillDomain;
use crate::error::SuperviseError;
use crate::request::SpawnRequest;

/// Owned job handle. Dropping it closes the handle, which terminates the
/// job because of `KILL_ON_JOB_CLOSE`.
struct JobHandle {
    handle: HANDLE,
}

// SAFETY: a HANDLE is an opaque kernel object reference usable from any
// thread.
unsafe impl Send for JobHandle {}

impl Drop for JobHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

pub(crate) struct WindowsKillDomain {
    pid: Option<u32>,
    job: Option<JobHandle>,
}

impl WindowsKillDomain {
    pub(crate) fn new(_cfg: &Config) -> Self {
        Self { pid: None, job: None }
    }

    fn command(request: &SpawnRequest) -> Command {
        let mut cmd = Command::new(request.program());
        cmd.args(request.argv());
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn create_job() -> windows::core::Result<JobHandle> {
        unsafe {
            let handle = CreateJobObjectW(None, None)?;
            let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = std::mem::zeroed();
            info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
            SetInformationJobObject(
                handle,
                JobObjectExtendedLimitInformation,
                (&raw const info).cast(),
                std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
            )?;
            Ok(JobHandle { handle })
        }
    }

    fn assign(job: &JobHandle, pid: u32) -> windows::core::Result<()> {
        unsafe {
            let process = OpenProcess(PROCESS_SET_QUOTA | PROCESS_TERMINATE, false, pid)?;
            let assigned = AssignProcessToJobObject(job.handle, process);
            let _ = CloseHandle(process);
            assigned
        }
    }

    /// `taskkill /T` walks the child tree in the OS; `/F` makes it
    /// forceful. Used only when the job primitive is gone.
    async fn taskkill(root: u32, force: bool) {
        let mut cmd = Command::new("taskkill");
        cmd.args(["/PID", &root.to_string(), "/T"]);
        if force {
            cmd.arg("/F");
        }
        match cmd.output().await {
            Ok(out) if out.status.success() => {}
            Ok(out) => debug!(root, code = ?out.status.code(), "taskkill reported failure"),
            Err(err) => warn!(root, %err, "taskkill did not run"),
        }
    }
}

#[async_trait]
impl KillDomain for WindowsKillDomain {
    async fn spawn_and_attach(
        &mut self,
        request: &SpawnRequest,
    ) -> Result<ChildHandle, SuperviseError> {
        let job = match Self::create_job() {
            Ok(job) => Some(job),
            Err(err) => {
                warn!(%err, "job object unavailable; falling back to taskkill");
                None
            }
        };

        let child = Self::command(request)
            .spawn()
            .map_err(|source| SuperviseError::Spawn { source })?;
        let handle = ChildHandle::new(child);

        self.job = match job {
            Some(job) => match Self::assign(&job, handle.pid()) {
                Ok(()) => Some(job),
                Err(err) => {
                    // Job dies here unused; closing it must not kill the
                    // fresh child, and an empty job kills nothing.
                    warn!(pid = handle.pid(), %err, "job assignment failed; falling back to taskkill");
                    None
                }
            },
            None => None,
        };

        self.pid = Some(handle.pid());
        debug!(pid = handle.pid(), jobbed = self.job.is_some(), "child attached");
        Ok(handle)
    }

    async fn signal_terminate(&mut self) {
        let Some(pid) = self.pid else { return };
        match self.job.take() {
            // KILL_ON_JOB_CLOSE: dropping the last handle terminates the
            // whole job.
            Some(job) => drop(job),
            None => Self::taskkill(pid, false).await,
        }
    }

    async fn terminate_now(&mut self) {
        let Some(pid) = self.pid else { return };
        if let Some(job) = &self.job {
            let terminated = unsafe { TerminateJobObject(job.handle, 1) };
            match terminated {
                Ok(()) => return,
                Err(err) => warn!(pid, %err, "TerminateJobObject failed; falling back to taskkill"),
            }
        }
        Self::taskkill(pid, true).await;
    }

    fn release(&mut self) {
        if let Some(job) = self.job.take() {
            drop(job);
        }
        if let Some(pid) = self.pid.take() {
            debug!(pid, "kill domain released");
        }
    }
}
