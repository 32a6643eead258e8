//! # Read-only descendant walk over the OS process table.
//!
//! Builds a parent→children adjacency from one native process-table
//! snapshot and collects every transitive descendant of a root pid. Used
//! for diagnostics at kill boundaries and as the kill list in the degraded
//! Unix path. Never the primary kill mechanism where a kill-group
//! primitive exists: a table walk races descendant creation.

use std::collections::{HashMap, HashSet};

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

/// The process table is untrusted input; a cycle in reported parent pids
/// must not hang the walk.
const MAX_WALK_DEPTH: u32 = 64;

/// Returns all live transitive descendants of `root_pid`, leaves first.
///
/// The root itself is not included. Each call takes a fresh snapshot; the
/// result is inherently racy against concurrent forks, which is why
/// callers on the degraded kill path repeat the walk over several passes.
pub fn descendants(root_pid: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing(),
    );

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, proc_) in system.processes() {
        if let Some(parent) = proc_.parent() {
            children
                .entry(parent.as_u32())
                .or_default()
                .push(pid.as_u32());
        }
    }

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(root_pid);
    collect_post_order(&children, root_pid, 0, &mut seen, &mut out);

    debug!(root = root_pid, count = out.len(), "descendant walk");
    out
}

fn collect_post_order(
    children: &HashMap<u32, Vec<u32>>,
    pid: u32,
    depth: u32,
    seen: &mut HashSet<u32>,
    out: &mut Vec<u32>,
) {
    if depth >= MAX_WALK_DEPTH {
        return;
    }
    let Some(kids) = children.get(&pid) else {
        return;
    };
    for &kid in kids {
        if !seen.insert(kid) {
            continue;
        }
        collect_post_order(children, kid, depth + 1, seen, out);
        out.push(kid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_root_has_no_descendants() {
        // Pid 0 parents nothing we can observe as a child of ours.
        let ds = descendants(u32::MAX - 7);
        assert!(ds.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn finds_a_direct_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("5")
            .spawn()
            .expect("spawn sleep");
        let ds = descendants(std::process::id());
        assert!(ds.contains(&child.id()));
        child.kill().ok();
        child.wait().ok();
    }

    #[test]
    fn post_order_puts_leaves_first() {
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        children.insert(1, vec![2]);
        children.insert(2, vec![3]);

        let mut out = Vec::new();
        let mut seen = HashSet::from([1]);
        collect_post_order(&children, 1, 0, &mut seen, &mut out);
        assert_eq!(out, vec![3, 2]);
    }

    #[test]
    fn cycles_do_not_hang() {
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        children.insert(1, vec![2]);
        children.insert(2, vec![1]);

        let mut out = Vec::new();
        let mut seen = HashSet::from([1]);
        collect_post_order(&children, 1, 0, &mut seen, &mut out);
        assert_eq!(out, vec![2]);
    }
}
