use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Spawned,
    Exited,
    DeadlineExpired,
    CancelRequested,
    TermSignalled,
    ForceKilled,
    Released,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub exit_code: Option<i32>,
    pub elapsed: Option<Duration>,
    pub error: Option<String>,
    pub pid: Option<u32>,
    pub kind: EventKind,
    pub at: SystemTime,
}

impl Event {
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            at: SystemTime::now(),
            exit_code: None,
            elapsed: None,
            error: None,
            pid: None,
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed = Some(d);
        self
    }

    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fill_fields() {
        let ev = Event::now(EventKind::Exited)
            .with_pid(42)
            .with_exit_code(0)
            .with_elapsed(Duration::from_millis(10));
        assert_eq!(ev.kind, EventKind::Exited);
        assert_eq!(ev.pid, Some(42));
        assert_eq!(ev.exit_code, Some(0));
        assert!(ev.error.is_none());
    }
}
