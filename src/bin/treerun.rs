//! Supervise-and-verify runner.
//!
//! Reads its whole configuration from the environment, supervises one
//! `forktree` payload under a deadline, then asks the OS process table
//! whether any tagged process survived and prints a metrics document.
//!
//! ## Environment
//! | Variable         | Default                      |
//! |------------------|------------------------------|
//! | `DEPTH`          | 3                            |
//! | `BREADTH`        | 5                            |
//! | `SLEEPMS`        | 300000                       |
//! | `TIMEOUTMS`      | 5000                         |
//! | `GRACEFULMS`     | 500                          |
//! | `VERIFY_DELAYMS` | 1200                         |
//! | `TAG`            | `TEST_<random-8-hex>`        |
//! | `TREE_BIN`       | `forktree` next to this exe  |
//!
//! Exit code 0 means the verification passed, 2 means survivors were
//! detected. The payload's own exit code is reported inside the metrics
//! document, never as the runner's exit code.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use procvisor::{count_by_tag, Config, LogObserver, SpawnRequest, Supervisor};

const EXIT_OK: i32 = 0;
const EXIT_SURVIVORS: i32 = 2;

#[derive(Serialize)]
struct Metrics {
    started_at: String,
    os: String,
    depth: u32,
    breadth: u32,
    timeout_ms: u64,
    graceful_ms: u64,
    tag: String,
    runner_exit_code: i32,
    total_elapsed_ms: u64,
    processes_seen_before_verify: usize,
    processes_seen_after_verify: usize,
    killed_tree_confirmed: bool,
    opened_total: u64,
    opened_by_level: BTreeMap<u32, u64>,
    closed_total: u64,
    closed_by_level: Option<BTreeMap<u32, u64>>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    std::process::exit(run().await);
}

async fn run() -> i32 {
    let depth = env_parse("DEPTH", 3u32);
    let breadth = env_parse("BREADTH", 5u32);
    let sleep_ms = env_parse("SLEEPMS", 300_000u64);
    let timeout_ms = env_parse("TIMEOUTMS", 5_000u64);
    let graceful_ms = env_parse("GRACEFULMS", 500u64);
    let verify_delay_ms = env_parse("VERIFY_DELAYMS", 1_200u64);
    let tag = env::var("TAG").unwrap_or_else(|_| format!("TEST_{:08x}", rand::random::<u32>()));
    let payload = payload_path();

    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let t0 = Instant::now();

    // Ctrl-C cancels the supervision; the tree is still torn down.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut cfg = Config::default();
    cfg.graceful_wait = Duration::from_millis(graceful_ms);
    let sup = Supervisor::new(cfg, vec![Arc::new(LogObserver)]);

    let request = SpawnRequest::new(payload.to_string_lossy())
        .arg("--depth")
        .arg(depth.to_string())
        .arg("--breadth")
        .arg(breadth.to_string())
        .arg("--sleepMs")
        .arg(sleep_ms.to_string())
        .arg("--tag")
        .arg(&tag);

    let runner_exit_code = match sup
        .run_cancellable(request, Duration::from_millis(timeout_ms), cancel)
        .await
    {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            warn!(error = %err, label = err.as_label(), "supervision failed");
            -1
        }
    };

    // Two probes with a settle delay between them; the OS table can lag
    // behind the actual kills.
    let seen_before = count_by_tag(&tag);
    tokio::time::sleep(Duration::from_millis(verify_delay_ms)).await;
    let seen_after = count_by_tag(&tag);
    let survivors = seen_before.min(seen_after);
    let confirmed = survivors == 0;

    let opened_by_level = opened_levels(depth, breadth);
    let opened_total: u64 = opened_by_level.values().sum();
    let closed_total = opened_total.saturating_sub(survivors as u64);

    let metrics = Metrics {
        started_at,
        os: env::consts::OS.to_string(),
        depth,
        breadth,
        timeout_ms,
        graceful_ms,
        tag,
        runner_exit_code,
        total_elapsed_ms: t0.elapsed().as_millis() as u64,
        processes_seen_before_verify: seen_before,
        processes_seen_after_verify: seen_after,
        killed_tree_confirmed: confirmed,
        opened_total,
        closed_total,
        closed_by_level: confirmed.then(|| opened_by_level.clone()),
        opened_by_level,
    };

    println!("=== METRICS ===");
    println!(
        "{}",
        serde_json::to_string_pretty(&metrics).expect("metrics serialize")
    );

    if confirmed {
        EXIT_OK
    } else {
        EXIT_SURVIVORS
    }
}

/// Level 0 is the root; every payload at level k spawns `breadth` children
/// at level k+1, so level k holds `breadth^k` processes.
fn opened_levels(depth: u32, breadth: u32) -> BTreeMap<u32, u64> {
    (0..=depth)
        .map(|level| (level, u64::from(breadth).pow(level)))
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn payload_path() -> PathBuf {
    if let Ok(explicit) = env::var("TREE_BIN") {
        return PathBuf::from(explicit);
    }
    let name = format!("forktree{}", env::consts::EXE_SUFFIX);
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .unwrap_or_else(|| PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_the_geometric_series() {
        let levels = opened_levels(3, 5);
        assert_eq!(levels.get(&0), Some(&1));
        assert_eq!(levels.get(&1), Some(&5));
        assert_eq!(levels.get(&2), Some(&25));
        assert_eq!(levels.get(&3), Some(&125));
        assert_eq!(levels.values().sum::<u64>(), 156);
    }

    #[test]
    fn breadth_one_opens_one_per_level() {
        let levels = opened_levels(4, 1);
        assert!(levels.values().all(|&n| n == 1));
        assert_eq!(levels.values().sum::<u64>(), 5);
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        env::set_var("PROCVISOR_TEST_PARSE", "not-a-number");
        assert_eq!(env_parse("PROCVISOR_TEST_PARSE", 7u32), 7);
        env::remove_var("PROCVISOR_TEST_PARSE");
    }
}
