//! Shared helpers for end-to-end `armory` tests.
//!
//! Every test gets its own store in a temp directory, seeded by `armory
//! init`. Tests run the real binary via `CARGO_BIN_EXE_armory` so they
//! exercise the same preconditions and argument parsing a real invocation
//! would hit.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run `armory` with the given args against the store at `dir`.
pub fn armory_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_armory"))
        .args(args)
        .current_dir(dir)
        .env("SUDO_USER", "tester")
        .output()
        .expect("failed to execute armory")
}

/// Run `armory` and assert it succeeds. Returns stdout as a string.
pub fn armory_ok(dir: &Path, args: &[&str]) -> String {
    let out = armory_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "armory {} failed:\nstdout: {stdout}\nstderr: {stderr}", args.join(" "));
    stdout.to_string()
}

/// Run `armory` and assert it fails. Returns stderr as a string.
pub fn armory_fails(dir: &Path, args: &[&str]) -> String {
    let out = armory_in(dir, args);
    assert!(
        !out.status.success(),
        "expected armory {} to fail, but it succeeded.\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}

/// Create a fresh, initialized store in a temp directory.
pub fn setup_store() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    armory_ok(dir.path(), &["init"]);
    dir
}

/// Path to a file relative to a store root.
pub fn store_path(dir: &Path, rel: &str) -> PathBuf {
    dir.join(rel)
}
