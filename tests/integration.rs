//! Integration tests for rustfxr

use assert_cmd::Command;
use predicates::prelude::*;

fn rustfxr(hostfxr_path : &str) -> Command {
    let mut cmd = Command::cargo_bin("rustfxr").unwrap();
    cmd.env("RUSTFXR_HOSTFXR_PATH", hostfxr_path)
        .env("RUST_LOG", "rustfxr=debug")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_missing_hostfxr_fails_before_runtime_init() {
    rustfxr("/nonexistent/dotnet/host/fxr/8.0.0/libhostfxr.so")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Hello from host").not())
        .stderr(predicate::str::contains("Failed to load hostfxr"))
        .stderr(predicate::str::contains("Initializing runtime").not());
}

#[cfg(target_os = "linux")]
#[test]
fn test_library_without_hostfxr_exports_fails() {
    rustfxr("libc.so.6")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "hostfxr does not export hostfxr_initialize_for_runtime_config",
        ))
        .stderr(predicate::str::contains("Initializing runtime").not());
}

#[test]
fn test_arguments_are_ignored() {
    rustfxr("/nonexistent/libhostfxr.so")
        .args(["--help", "extra"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Bootstrap failed"));
}

#[test]
fn test_failure_is_reported_on_one_line() {
    let output = rustfxr("/nonexistent/libhostfxr.so").output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    let errors: Vec<&str> = stderr.lines().filter(|line| line.contains("ERROR")).collect();
    assert_eq!(errors.len(), 1, "stderr was:\n{}", stderr);
    assert!(errors[0].contains("Failed to load hostfxr from /nonexistent/libhostfxr.so"));
}
