//! Process-level shutdown behavior of the `beaconradar` binary.

#![cfg(unix)]

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const SHOW_CURSOR: &str = "\x1b[?25h";

fn send_signal(pid: u32, signal: &str) {
    let status = Command::new("kill")
        .arg(format!("-{signal}"))
        .arg(pid.to_string())
        .status()
        .unwrap();
    assert!(status.success());
}

fn watch_until_signal(signal: &str) -> String {
    let mut child = Command::new(env!("CARGO_BIN_EXE_beaconradar"))
        .args(["watch", "--no-stdin", "--no-log", "--exec", "A=sleep 30"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Let the handler install and the first frame go out.
    thread::sleep(Duration::from_millis(500));
    send_signal(child.id(), signal);

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if child.try_wait().unwrap().is_some() {
            break;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("watch did not exit after SIG{signal}");
        }
        thread::sleep(Duration::from_millis(20));
    }

    let mut out = String::new();
    child.stdout.take().unwrap().read_to_string(&mut out).unwrap();
    out
}

#[test]
fn sigterm_restores_cursor() {
    let out = watch_until_signal("TERM");
    assert!(out.ends_with(SHOW_CURSOR), "tail: {:?}", out.chars().rev().take(16).collect::<String>());
}

#[test]
fn sighup_restores_cursor() {
    let out = watch_until_signal("HUP");
    assert!(out.ends_with(SHOW_CURSOR));
}

#[test]
fn sigint_restores_cursor() {
    let out = watch_until_signal("INT");
    assert!(out.ends_with(SHOW_CURSOR));
}
