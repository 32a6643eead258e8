//! Exponentially forking payload used to exercise tree termination.
//!
//! Every instance announces itself on stdout, spawns `--breadth` copies of
//! itself with `--depth` reduced by one, sleeps `--sleepMs`, and announces
//! again on the way out. The `--tag` travels down the whole tree on every
//! command line so a verifier can find survivors without tracking pids.
//!
//! Kept free of dependencies on purpose: a tree of depth d and breadth b
//! launches b^d copies of this binary and startup cost multiplies.

use std::env;
use std::io::Write;
use std::process::Command;
use std::thread;
use std::time::Duration;

struct Opts {
    depth: u32,
    breadth: u32,
    sleep_ms: u64,
    tag: String,
}

fn parse() -> Opts {
    let mut opts = Opts {
        depth: 0,
        breadth: 0,
        sleep_ms: 0,
        tag: String::new(),
    };
    let mut args = env::args().skip(1);
    while let Some(flag) = args.next() {
        let value = args.next().unwrap_or_default();
        match flag.as_str() {
            "--depth" => opts.depth = value.parse().unwrap_or(0),
            "--breadth" => opts.breadth = value.parse().unwrap_or(0),
            "--sleepMs" => opts.sleep_ms = value.parse().unwrap_or(0),
            "--tag" => opts.tag = value,
            _ => {}
        }
    }
    opts
}

fn banner(opts: &Opts) {
    println!(
        "PID={} depth={} breadth={} tag={}",
        std::process::id(),
        opts.depth,
        opts.breadth,
        opts.tag
    );
    let _ = std::io::stdout().flush();
}

fn main() {
    let opts = parse();
    banner(&opts);

    if opts.depth > 0 {
        let exe = env::current_exe().expect("own executable path");
        for _ in 0..opts.breadth {
            let spawned = Command::new(&exe)
                .arg("--depth")
                .arg((opts.depth - 1).to_string())
                .arg("--breadth")
                .arg(opts.breadth.to_string())
                .arg("--sleepMs")
                .arg(opts.sleep_ms.to_string())
                .arg("--tag")
                .arg(&opts.tag)
                .spawn();
            if let Err(err) = spawned {
                eprintln!("forktree: spawn failed: {err}");
            }
        }
    }

    thread::sleep(Duration::from_millis(opts.sleep_ms));
    banner(&opts);
}
