//! End-to-end supervision scenarios against real OS processes.
//!
//! These lean on `sleep` and `sh`, so the signal-behavior scenarios are
//! Unix-only; the tree-kill scenarios in `tree_kill.rs` use the bundled
//! payload and run everywhere.

#[cfg(unix)]
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
use tokio_util::sync::CancellationToken;

use procvisor::{Config, SpawnRequest, SuperviseError, Supervisor};

#[cfg(unix)]
#[tokio::test]
async fn natural_exit_before_deadline() {
    let sup = Supervisor::new(Config::default(), Vec::new());
    let outcome = sup
        .run_with_timeout(SpawnRequest::new("sleep").arg("0.2"), Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, 0);
    assert!(!outcome.timed_out);
    assert!(!outcome.escalated);
    assert_eq!(outcome.graceful_window_used, Duration::ZERO);
}

#[cfg(unix)]
#[tokio::test]
async fn term_handler_exits_within_the_grace_window() {
    let mut cfg = Config::default();
    cfg.graceful_wait = Duration::from_millis(500);
    let sup = Supervisor::new(cfg, Vec::new());

    // `wait` is interruptible, so the trap runs as soon as TERM lands.
    let req = SpawnRequest::new("sh").args(["-c", "trap 'exit 0' TERM; sleep 30 & wait"]);
    let outcome = sup
        .run_with_timeout(req, Duration::from_millis(200))
        .await
        .unwrap();

    assert!(outcome.timed_out);
    assert!(!outcome.escalated);
    assert_eq!(outcome.exit_code, 0);
    assert!(outcome.elapsed >= Duration::from_millis(200));
    assert!(outcome.elapsed < Duration::from_millis(1500));
}

#[cfg(unix)]
#[tokio::test]
async fn term_ignorer_forces_escalation() {
    let mut cfg = Config::default();
    cfg.graceful_wait = Duration::from_millis(200);
    let sup = Supervisor::new(cfg, Vec::new());

    // The ignored disposition is inherited, so the whole group shrugs off
    // the graceful signal and only the forceful kill lands.
    let req = SpawnRequest::new("sh").args(["-c", "trap '' TERM; sleep 30"]);
    let outcome = sup
        .run_with_timeout(req, Duration::from_millis(300))
        .await
        .unwrap();

    assert!(outcome.timed_out);
    assert!(outcome.escalated);
    assert_ne!(outcome.exit_code, 0);
    assert!(outcome.graceful_window_used >= Duration::from_millis(200));
}

#[cfg(unix)]
#[tokio::test]
async fn cancellation_behaves_like_the_deadline() {
    let sup = Supervisor::new(Config::default(), Vec::new());
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            cancel.cancel();
        });
    }

    let outcome = sup
        .run_cancellable(
            SpawnRequest::new("sleep").arg("30"),
            Duration::from_secs(30),
            cancel,
        )
        .await
        .unwrap();

    assert!(outcome.timed_out);
    assert!(outcome.elapsed < Duration::from_secs(5));
}

#[cfg(unix)]
#[tokio::test]
async fn concurrent_runs_on_one_instance_are_rejected() {
    let sup = Arc::new(Supervisor::new(Config::default(), Vec::new()));

    let first = {
        let sup = Arc::clone(&sup);
        tokio::spawn(async move {
            sup.run_with_timeout(SpawnRequest::new("sleep").arg("1"), Duration::from_secs(5))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let err = sup
        .run_with_timeout(SpawnRequest::new("sleep").arg("0.1"), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, SuperviseError::Busy));

    let outcome = first.await.unwrap().unwrap();
    assert!(!outcome.timed_out);
}

#[cfg(unix)]
#[tokio::test]
async fn instance_is_reusable_after_a_run() {
    let mut cfg = Config::default();
    cfg.graceful_wait = Duration::from_millis(200);
    let sup = Supervisor::new(cfg, Vec::new());

    let natural = sup
        .run_with_timeout(SpawnRequest::new("sleep").arg("0.2"), Duration::from_secs(2))
        .await
        .unwrap();
    assert!(!natural.timed_out);

    let killed = sup
        .run_with_timeout(
            SpawnRequest::new("sh").args(["-c", "trap '' TERM; sleep 30"]),
            Duration::from_millis(300),
        )
        .await
        .unwrap();
    assert!(killed.timed_out);
    assert!(killed.escalated);
}

#[cfg(unix)]
#[tokio::test]
async fn independent_supervisors_do_not_cross_kill() {
    let quiet = Supervisor::new(Config::default(), Vec::new());
    let noisy = Supervisor::new(Config::default(), Vec::new());

    // One tree is killed hard while the other runs to completion; the
    // survivor finishing cleanly proves the kill stayed in its own domain.
    let (long_lived, killed) = tokio::join!(
        quiet.run_with_timeout(SpawnRequest::new("sleep").arg("0.5"), Duration::from_secs(5)),
        noisy.run_with_timeout(SpawnRequest::new("sleep").arg("30"), Duration::from_millis(200)),
    );

    let long_lived = long_lived.unwrap();
    assert_eq!(long_lived.exit_code, 0);
    assert!(!long_lived.timed_out);

    let killed = killed.unwrap();
    assert!(killed.timed_out);
}

#[tokio::test]
async fn zero_deadline_never_spawns() {
    let sup = Supervisor::new(Config::default(), Vec::new());
    let err = sup
        .run_with_timeout(SpawnRequest::new("sleep").arg("1"), Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, SuperviseError::InvalidTimeout { .. }));
}
