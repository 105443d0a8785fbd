//! The binary must exit on SIGINT even while the console is waiting on stdin.

#![cfg(unix)]

use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tempfile::tempdir;

#[test]
fn test_interrupt_exits_with_console_open() {
    let dir = tempdir().unwrap();
    let feed_path = dir.path().join("targets.json");
    std::fs::write(&feed_path, "[]").unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_tactical-monitor"))
        .arg("--feed-file")
        .arg(&feed_path)
        .arg("--config-dir")
        .arg(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    // Held open so the console thread stays blocked in read
    let _stdin = child.stdin.take();

    sleep(Duration::from_millis(500));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exited = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break Some(status);
        }
        if Instant::now() > deadline {
            break None;
        }
        sleep(Duration::from_millis(50));
    };
    if exited.is_none() {
        let _ = child.kill();
    }
    assert!(exited.is_some(), "still running 10s after SIGINT");
}
