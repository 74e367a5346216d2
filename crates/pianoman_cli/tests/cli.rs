//! End-to-end tests for the pianoman binary that need no network.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::tempdir;

fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    fs::write(
        &path,
        format!("auth:\n  api: {{ key: k, secret: s }}\n  user: {{ name: u, password: p }}\n{extra}"),
    )
    .unwrap();
    path
}

fn pianoman(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pianoman"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn version() {
    let output = pianoman(&["version"], "");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_config_fails() {
    let temp = tempdir().unwrap();
    let missing = temp.path().join("nope.yaml");

    let output = pianoman(&["--config", missing.to_str().unwrap(), "songstart"], "");
    assert!(!output.status.success());
}

#[test]
fn unknown_events_are_ignored() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path(), "");

    let output = pianoman(
        &["--config", config.to_str().unwrap(), "usergetstations"],
        "garbage",
    );
    assert!(output.status.success(), "{output:?}");

    // stdout belongs to pianobar
    assert!(output.stdout.is_empty());
}

#[test]
fn ineligible_track_is_not_queued() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path(), "");

    let output = pianoman(
        &["--config", config.to_str().unwrap(), "songfinish"],
        "artist=a\ntitle=b\nsongDuration=300\nsongPlayed=5\n",
    );
    assert!(output.status.success(), "{output:?}");

    let output = pianoman(
        &["--config", config.to_str().unwrap(), "inspect", "--format", "json"],
        "",
    );
    assert!(output.status.success(), "{output:?}");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["pending_tracks"], 0);
    assert_eq!(json["path"], temp.path().join("wal").display().to_string());
}

#[test]
fn subcommands_follow_global_options() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path(), "");
    let config = config.to_str().unwrap();

    let output = pianoman(&["--config", config, "-v", "flush"], "");
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "Nothing to scrobble\n");

    // Not mistaken for an eventcmd invocation
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(!stderr.contains("received event"), "{stderr}");

    let output = pianoman(&["-c", config, "inspect", "--format", "json", "--tracks"], "");
    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["pending_tracks"], 0);
}

#[cfg(unix)]
#[test]
fn warns_about_readable_config() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().unwrap();
    let config = write_config(temp.path(), "");

    fs::set_permissions(&config, fs::Permissions::from_mode(0o644)).unwrap();
    let output = pianoman(&["--config", config.to_str().unwrap(), "usergetstations"], "");
    assert!(output.status.success(), "{output:?}");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("insecure permissions"), "{stderr}");
    assert!(stderr.contains("644"), "{stderr}");

    fs::set_permissions(&config, fs::Permissions::from_mode(0o600)).unwrap();
    let output = pianoman(&["--config", config.to_str().unwrap(), "usergetstations"], "");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(!stderr.contains("insecure permissions"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn ignored_events_are_still_chained() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().unwrap();
    let out = temp.path().join("chained");
    let script = temp.path().join("next.sh");
    fs::write(
        &script,
        format!("#!/bin/sh\necho \"$1\" > {0}\ncat >> {0}\n", out.display()),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let config = write_config(
        temp.path(),
        &format!("eventcmd:\n  next: {}\n", script.display()),
    );

    let output = pianoman(
        &["--config", config.to_str().unwrap(), "userlogin"],
        "pRet=1\n",
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(fs::read_to_string(&out).unwrap(), "userlogin\npRet=1\n");
}
