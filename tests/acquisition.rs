//! End-to-end scenarios exercising the compiled `runtime-reporter` binary
//! against a real child process, as vector's own `tests/shutdown.rs` drives
//! its binary against real sources/sinks.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn build_packet(ts: u64, kind: u32, payload: &str) -> Vec<u8> {
    const MAX_PKG_SIZE: usize = 1024;
    const PAYLOAD_TEXT_SIZE: usize = 1010;
    let mut packet = vec![0u8; MAX_PKG_SIZE];
    packet[0..8].copy_from_slice(&ts.to_ne_bytes());
    packet[8..12].copy_from_slice(&kind.to_ne_bytes());
    let bytes = payload.as_bytes();
    let region = &mut packet[12..12 + PAYLOAD_TEXT_SIZE];
    let n = bytes.len().min(region.len());
    region[..n].copy_from_slice(&bytes[..n]);
    packet
}

fn cat_script(dir: &Path, fixture: &[u8]) -> PathBuf {
    let fixture_path = dir.join("fixture.bin");
    fs::write(&fixture_path, fixture).unwrap();
    write_script(dir, "sut.sh", &format!("#!/bin/sh\ncat '{}'\n", fixture_path.display()))
}

#[test]
fn empty_stream_exits_successfully_with_a_truncated_main_log() {
    let dir = tempfile::tempdir().unwrap();
    let sut = write_script(dir.path(), "sut.sh", "#!/bin/sh\ntrue\n");

    let assert = Command::cargo_bin("runtime-reporter")
        .unwrap()
        .arg(&sut)
        .arg("--files-path")
        .arg(dir.path())
        .assert();

    assert.success();
    let contents = fs::read_to_string(dir.path().join("main_log.csv")).unwrap();
    assert_eq!(contents, "");
}

#[test]
fn three_timed_events_are_written_as_csv_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = build_packet(1, 0, "a");
    fixture.extend(build_packet(2, 0, "b"));
    fixture.extend(build_packet(3, 0, "c"));
    let sut = cat_script(dir.path(), &fixture);

    let assert = Command::cargo_bin("runtime-reporter")
        .unwrap()
        .arg(&sut)
        .arg("--files-path")
        .arg(dir.path())
        .assert();

    assert.success();
    let contents = fs::read_to_string(dir.path().join("main_log.csv")).unwrap();
    assert_eq!(contents, "1,timed_event,a\n2,timed_event,b\n3,timed_event,c\n");
}

#[test]
fn self_logging_component_writes_to_its_own_sink() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = build_packet(0, 4, "worker");
    fixture.extend(build_packet(5, 5, "worker,42,started"));
    let sut = cat_script(dir.path(), &fixture);

    let assert = Command::cargo_bin("runtime-reporter")
        .unwrap()
        .arg(&sut)
        .arg("--files-path")
        .arg(dir.path())
        .assert();

    assert.success();
    let contents = fs::read_to_string(dir.path().join("worker_log.csv")).unwrap();
    assert_eq!(contents, "5,42,started\n");
    let main_contents = fs::read_to_string(dir.path().join("main_log.csv")).unwrap();
    assert_eq!(main_contents, "");
}

#[test]
fn unknown_kind_is_tagged_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_packet(9, 200, "mystery");
    let sut = cat_script(dir.path(), &fixture);

    let assert = Command::cargo_bin("runtime-reporter")
        .unwrap()
        .arg(&sut)
        .arg("--files-path")
        .arg(dir.path())
        .assert();

    assert.success();
    let contents = fs::read_to_string(dir.path().join("main_log.csv")).unwrap();
    assert_eq!(contents, "9,invalid,mystery\n");
}

#[test]
fn timeout_stops_an_endless_sut_within_a_couple_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let fixture_path = dir.path().join("fixture.bin");
    fs::write(&fixture_path, build_packet(1, 0, "tick")).unwrap();
    let sut = write_script(
        dir.path(),
        "sut.sh",
        &format!(
            "#!/bin/sh\nwhile true; do cat '{}'; sleep 0.05; done\n",
            fixture_path.display()
        ),
    );

    let start = Instant::now();
    let assert = Command::cargo_bin("runtime-reporter")
        .unwrap()
        .arg(&sut)
        .arg("--files-path")
        .arg(dir.path())
        .arg("--timeout")
        .arg("1")
        .assert();

    assert.success();
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn sigint_stops_an_endless_sut() {
    let dir = tempfile::tempdir().unwrap();
    let fixture_path = dir.path().join("fixture.bin");
    fs::write(&fixture_path, build_packet(1, 0, "tick")).unwrap();
    let sut = write_script(
        dir.path(),
        "sut.sh",
        &format!(
            "#!/bin/sh\nwhile true; do cat '{}'; sleep 0.05; done\n",
            fixture_path.display()
        ),
    );

    let mut reporter = Command::cargo_bin("runtime-reporter")
        .unwrap()
        .arg(&sut)
        .arg("--files-path")
        .arg(dir.path())
        .spawn()
        .unwrap();

    sleep(Duration::from_millis(300));
    kill(Pid::from_raw(reporter.id() as i32), Signal::SIGINT).unwrap();

    let now = Instant::now();
    assert!(reporter.wait().unwrap().success());
    assert!(now.elapsed() < Duration::from_secs(3));
}
