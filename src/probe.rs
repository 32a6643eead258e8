//! # Survivor probe keyed by a command-line tag.
//!
//! After a supervised tree has been terminated, a verifier can ask the OS
//! whether any tagged process remains. A process counts when its command
//! line carries both the payload marker (`--tag`) and the tag value. The
//! probe reads native process snapshots directly; no shell, no `grep`, and
//! the probing process itself is excluded by pid.

use sysinfo::{Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// Marker every payload instance carries on its command line.
pub const TAG_MARKER: &str = "--tag";

/// Counts live processes whose command line matches the tag.
pub fn count_by_tag(tag: &str) -> usize {
    let system = snapshot();
    let me = std::process::id();
    let count = system
        .processes()
        .iter()
        .filter(|(pid, proc_)| pid.as_u32() != me && matches_tag(proc_, tag))
        .count();
    debug!(tag, count, "tag probe");
    count
}

/// Whether any tagged process is still alive. Stops at the first match.
pub fn any_left(tag: &str) -> bool {
    let system = snapshot();
    let me = std::process::id();
    system
        .processes()
        .iter()
        .any(|(pid, proc_)| pid.as_u32() != me && matches_tag(proc_, tag))
}

fn snapshot() -> System {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );
    system
}

fn matches_tag(proc_: &Process, tag: &str) -> bool {
    let mut saw_marker = false;
    let mut saw_tag = false;
    for arg in proc_.cmd() {
        let arg = arg.to_string_lossy();
        if arg.contains(TAG_MARKER) {
            saw_marker = true;
        }
        if arg.contains(tag) {
            saw_tag = true;
        }
    }
    saw_marker && saw_tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_has_no_survivors() {
        let tag = "NO_SUCH_TAG_5f2a9c1d";
        assert_eq!(count_by_tag(tag), 0);
        assert!(!any_left(tag));
    }
}
