//! Tree termination verified through the OS process table.
//!
//! Drives the bundled `forktree` payload: each instance forks `breadth`
//! copies of itself down to the configured depth, all tagged on the
//! command line, all sleeping long enough that only the supervisor can be
//! responsible for their disappearance.

use std::time::Duration;

use procvisor::{any_left, count_by_tag, Config, SpawnRequest, Supervisor};

fn forktree_request(depth: u32, breadth: u32, tag: &str) -> SpawnRequest {
    SpawnRequest::new(env!("CARGO_BIN_EXE_forktree"))
        .arg("--depth")
        .arg(depth.to_string())
        .arg("--breadth")
        .arg(breadth.to_string())
        .arg("--sleepMs")
        .arg("300000")
        .arg("--tag")
        .arg(tag)
}

/// The OS table can lag the kills; give it a bounded settle window.
async fn assert_tag_drains(tag: &str) {
    for _ in 0..30 {
        if !any_left(tag) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!(
        "tagged processes still alive after settle window: {}",
        count_by_tag(tag)
    );
}

fn kill_config() -> Config {
    let mut cfg = Config::default();
    cfg.graceful_wait = Duration::from_millis(200);
    cfg
}

#[tokio::test]
async fn deep_tree_is_fully_terminated() {
    let sup = Supervisor::new(kill_config(), Vec::new());
    let tag = format!("TREETEST_DEEP_{:08x}", std::process::id());

    let outcome = sup
        .run_with_timeout(forktree_request(2, 2, &tag), Duration::from_millis(500))
        .await
        .unwrap();

    assert!(outcome.timed_out);
    assert_tag_drains(&tag).await;
}

#[tokio::test]
async fn wide_tree_is_fully_terminated() {
    let sup = Supervisor::new(kill_config(), Vec::new());
    let tag = format!("TREETEST_WIDE_{:08x}", std::process::id());

    let outcome = sup
        .run_with_timeout(forktree_request(1, 5, &tag), Duration::from_millis(500))
        .await
        .unwrap();

    assert!(outcome.timed_out);
    assert_tag_drains(&tag).await;
}

#[tokio::test]
async fn concurrent_supervisors_kill_disjoint_trees() {
    let a = Supervisor::new(kill_config(), Vec::new());
    let b = Supervisor::new(kill_config(), Vec::new());
    let tag_a = format!("TREETEST_A_{:08x}", std::process::id());
    let tag_b = format!("TREETEST_B_{:08x}", std::process::id());

    let (ra, rb) = tokio::join!(
        a.run_with_timeout(forktree_request(2, 2, &tag_a), Duration::from_millis(500)),
        b.run_with_timeout(forktree_request(2, 2, &tag_b), Duration::from_millis(500)),
    );
    assert!(ra.unwrap().timed_out);
    assert!(rb.unwrap().timed_out);

    assert_tag_drains(&tag_a).await;
    assert_tag_drains(&tag_b).await;
}

#[tokio::test]
async fn natural_exit_leaves_nothing_behind() {
    let sup = Supervisor::new(Config::default(), Vec::new());
    let tag = format!("TREETEST_FAST_{:08x}", std::process::id());

    // Leaf-only payload that exits on its own well inside the deadline.
    let request = SpawnRequest::new(env!("CARGO_BIN_EXE_forktree"))
        .arg("--depth")
        .arg("0")
        .arg("--breadth")
        .arg("0")
        .arg("--sleepMs")
        .arg("100")
        .arg("--tag")
        .arg(&tag);

    let outcome = sup
        .run_with_timeout(request, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, 0);
    assert!(!outcome.timed_out);
    assert!(!outcome.escalated);
    assert_tag_drains(&tag).await;
}
