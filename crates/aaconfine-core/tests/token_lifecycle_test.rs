//! Integration test: confinement token lifecycle.
//!
//! The token is drawn once per process, shared by every thread, and fresh in
//! every new process.
//!
//! Run: cargo test -p aaconfine-core --test token_lifecycle_test

use std::collections::HashSet;
use std::process::Command;
use std::sync::{Arc, Barrier};

use aaconfine_core::{Token, installed_token, process_token};

const PROBE_ENV: &str = "AACONFINE_TOKEN_PROBE";

#[test]
fn concurrent_first_use_installs_one_token() {
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                process_token().expect("token").as_raw()
            })
        })
        .collect();
    let values: HashSet<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();
    assert_eq!(values.len(), 1);
    let installed = installed_token().expect("installed").as_raw();
    assert!(values.contains(&installed));
}

#[test]
fn fresh_tokens_are_nonzero_and_distinct() {
    let draws: Vec<_> = (0..64)
        .map(|_| Token::generate().expect("entropy").as_raw())
        .collect();
    assert!(draws.iter().all(|&t| t != 0));
    let unique: HashSet<_> = draws.iter().collect();
    assert_eq!(unique.len(), draws.len());
}

/// Child side of `each_process_gets_its_own_token`; a no-op unless spawned
/// with the probe variable set.
#[test]
fn token_probe() {
    if std::env::var_os(PROBE_ENV).is_none() {
        return;
    }
    let token = process_token().expect("token").as_raw();
    println!("token={token:x}");
}

#[test]
fn each_process_gets_its_own_token() {
    let exe = std::env::current_exe().expect("test binary path");
    let mut seen = HashSet::new();
    for _ in 0..4 {
        let output = Command::new(&exe)
            .args(["--exact", "token_probe", "--nocapture", "--test-threads=1", "-q"])
            .env(PROBE_ENV, "1")
            .output()
            .expect("spawn probe");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        let token = stdout
            .lines()
            .find_map(|line| line.trim().strip_prefix("token="))
            .map(str::to_owned)
            .expect("probe printed a token");
        assert_ne!(token, "0");
        seen.insert(token);
    }
    assert_eq!(seen.len(), 4);
}
