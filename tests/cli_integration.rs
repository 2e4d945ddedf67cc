//! Integration tests for the `notices` CLI.
//!
//! Each test runs `notices` as a subprocess, usually inside a temp directory
//! holding its own notices.toml, and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the built `notices` binary.
fn notices_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("notices");
    path
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Run `notices` with the given args in the given directory, returning (stdout, stderr, success).
fn run_notices(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(notices_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("NOTICES_LOG")
        .output()
        .expect("failed to run notices");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `notices` expecting success, return stdout.
fn run_notices_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_notices(dir, args);
    if !success {
        panic!(
            "notices {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `notices` expecting failure, return stderr.
fn run_notices_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_notices(dir, args);
    if success {
        panic!("notices {:?} unexpectedly succeeded:\nstdout: {}", args, stdout);
    }
    stderr
}

// ---------------------------------------------------------------------------
// policy
// ---------------------------------------------------------------------------

#[test]
fn test_policy_defaults() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_notices_ok(tmp.path(), &["policy"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("KIND"));
    assert!(lines[1].starts_with("error"));
    assert!(lines[1].contains("#EF4444"));
    assert!(lines[2].starts_with("warning"));
    assert!(lines[2].contains("10s"));
    assert!(lines[5].starts_with("confirmation"));
}

#[test]
fn test_policy_json_reflects_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("notices.toml"),
        "[kinds.success]\ndismiss_delay_ms = 2500\n\n[kinds.error]\nauto_dismiss = true\n",
    )
    .unwrap();

    let out = run_notices_ok(tmp.path(), &["policy", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), 5);
    assert_eq!(arr[0]["kind"], "error");
    assert_eq!(arr[0]["auto_dismiss"], true);
    assert_eq!(arr[2]["kind"], "success");
    assert_eq!(arr[2]["dismiss_delay_ms"], 2500);
    // Confirmations ignore auto-dismiss settings
    assert_eq!(arr[4]["auto_dismiss"], false);
    assert!(arr[4].get("dismiss_delay_ms").is_none());
}

#[test]
fn test_invalid_config_is_an_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(tmp.path().join("notices.toml"), "[store]\ncapacity = 0\n").unwrap();
    let err = run_notices_err(tmp.path(), &["policy"]);
    assert!(err.contains("store.capacity must be at least 1"), "{err}");
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

#[test]
fn test_replay_issue_tracker_fixture() {
    let tmp = tempfile::TempDir::new().unwrap();
    let script = fixture("issue_tracker.script");
    let out = run_notices_ok(tmp.path(), &["replay", script.to_str().unwrap()]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        &lines[..7],
        &[
            "added #1 success: Issue saved (dismiss in 5s)",
            "api-error Save issue: network timeout",
            "added #2 error: Save issue failed: network timeout (auto-open)",
            "added #3 confirmation: Delete issue ISS-12? [Delete/Cancel] (auto-open)",
            "dismissed #1",
            "dismissed #3",
            "confirmation #3 accepted",
        ]
    );
    assert_eq!(lines[7], "list (3)");
    assert!(lines[8].starts_with("  #3 ? confirmation"));
    assert!(lines[8].contains("dismissed"));
    assert!(lines[8].ends_with("Delete issue: Delete issue ISS-12?"));
    assert!(lines[9].contains("Save issue failed: network timeout"));
    assert!(lines[9].contains("active"));
    assert_eq!(
        lines[11],
        "counts error=1 warning=0 success=0 info=0 confirmation=0 total=1"
    );
}

#[test]
fn test_replay_timeouts_fixture() {
    let tmp = tempfile::TempDir::new().unwrap();
    let script = fixture("timeouts.script");
    let out = run_notices_ok(tmp.path(), &["replay", script.to_str().unwrap()]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "added #1 warning: Disk almost full (auto-open) (dismiss in 10s)",
            "added #2 info: Sync finished (dismiss in 1500ms)",
            "added #3 confirmation: Discard draft? [Confirm/Cancel] (auto-open)",
            "dismissed #2",
            "counts error=0 warning=1 success=0 info=0 confirmation=1 total=2",
            "dismissed #1",
            "counts error=0 warning=0 success=0 info=0 confirmation=1 total=1",
            "dismissed #3",
            "confirmation #3 rejected",
            "counts error=0 warning=0 success=0 info=0 confirmation=0 total=0",
        ]
    );
}

#[test]
fn test_replay_uses_config_policy() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("notices.toml"),
        "[kinds.warning]\ndismiss_delay_ms = 2000\nauto_open = false\n",
    )
    .unwrap();
    fs::write(tmp.path().join("s.script"), "post warning \"Low disk\"\nwait 2s\n").unwrap();

    let out = run_notices_ok(tmp.path(), &["replay", "s.script"]);
    assert_eq!(
        out,
        "added #1 warning: Low disk (dismiss in 2s)\ndismissed #1\n"
    );
}

#[test]
fn test_replay_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("s.script"),
        "confirm \"Proceed?\"\nreject 1\nlist\n",
    )
    .unwrap();

    let out = run_notices_ok(tmp.path(), &["replay", "s.script", "--json"]);
    let values: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(values[0]["event"], "message-added");
    assert_eq!(values[0]["auto_open"], true);
    assert_eq!(values[0]["message"]["confirm"]["confirm_label"], "Confirm");
    assert_eq!(values[1]["event"], "message-dismissed");
    assert_eq!(values[2]["event"], "confirmation-settled");
    assert_eq!(values[2]["accepted"], false);
    assert_eq!(values[3]["list"][0]["dismissed"], true);
}

#[test]
fn test_replay_parse_error_names_line() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("bad.script"),
        "post info \"ok\"\n\nexplode now\n",
    )
    .unwrap();

    let err = run_notices_err(tmp.path(), &["replay", "bad.script"]);
    assert!(err.contains("line 3: unknown command: explode"), "{err}");
}

#[test]
fn test_replay_missing_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_notices_err(tmp.path(), &["replay", "nope.script"]);
    assert!(err.contains("cannot read"), "{err}");
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn test_config_init_set_show() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_notices_ok(tmp.path(), &["config", "init"]);
    assert!(out.starts_with("wrote "));
    let path = tmp.path().join("notices.toml");
    assert!(path.exists());

    let err = run_notices_err(tmp.path(), &["config", "init"]);
    assert!(err.contains("already exists"), "{err}");
    run_notices_ok(tmp.path(), &["config", "init", "--force"]);

    run_notices_ok(
        tmp.path(),
        &["config", "set", "kinds.warning.dismiss_delay_ms", "2500"],
    );
    run_notices_ok(tmp.path(), &["config", "set", "store.capacity", "20"]);

    // Comments from the template survive edits
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("# notices configuration"));
    assert!(text.contains("dismiss_delay_ms = 2500"));
    assert!(text.contains("capacity = 20"));

    let out = run_notices_ok(tmp.path(), &["config", "show", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["store"]["capacity"], 20);
    assert_eq!(parsed["kinds"]["warning"]["dismiss_delay_ms"], 2500);

    let out = run_notices_ok(tmp.path(), &["config"]);
    assert!(out.starts_with("# "));
    assert!(out.contains("capacity = 20"));
}

#[test]
fn test_config_set_rejects_bad_input() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_notices_ok(tmp.path(), &["config", "init"]);

    let err = run_notices_err(tmp.path(), &["config", "set", "store.nope", "1"]);
    assert!(err.contains("unknown config key: store.nope"), "{err}");

    let err = run_notices_err(tmp.path(), &["config", "set", "ui.panel_open", "maybe"]);
    assert!(err.contains("invalid value for ui.panel_open: maybe"), "{err}");

    let err = run_notices_err(tmp.path(), &["config", "set", "store.capacity", "0"]);
    assert!(err.contains("store.capacity must be at least 1"), "{err}");
    // A rejected edit leaves the file untouched
    let text = fs::read_to_string(tmp.path().join("notices.toml")).unwrap();
    assert!(text.contains("capacity = 100"));
}

#[test]
fn test_config_found_from_subdirectory() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("notices.toml"),
        "[kinds.info]\nicon = \"i\"\n",
    )
    .unwrap();
    let sub = tmp.path().join("a/b");
    fs::create_dir_all(&sub).unwrap();

    let out = run_notices_ok(&sub, &["policy", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed[3]["icon"], "i");

    // -C points discovery elsewhere
    let other = tempfile::TempDir::new().unwrap();
    let out = run_notices_ok(
        other.path(),
        &["-C", sub.to_str().unwrap(), "policy", "--json"],
    );
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed[3]["icon"], "i");
}
