//! Smoke tests for the `hookgate` binary.
//!
//! Each test points `HOOKGATE_HOME` at a temp dir and strips provider
//! credentials from the environment, so nothing here touches the network.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

const CREDENTIAL_VARS: &[&str] = &[
    "HOOKGATE_PROXY_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "HOOKGATE_MODEL",
];

fn hookgate(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hookgate"));
    cmd.env("HOOKGATE_HOME", home);
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn run_hook(home: &Path, stdin: &str) -> Output {
    let mut child = hookgate(home)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn hookgate");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().expect("failed to wait on hookgate")
}

fn envelope(session: &str, tool: &str, input: Value) -> String {
    serde_json::json!({
        "session_id": session,
        "transcript_path": "/tmp/transcript.jsonl",
        "tool_name": tool,
        "tool_input": input,
        "cwd": "/projects/demo",
    })
    .to_string()
}

fn decision_of(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(stdout.trim()).expect("stdout should be JSON");
    json["hookSpecificOutput"].clone()
}

fn log_lines(home: &Path) -> Vec<String> {
    std::fs::read_to_string(home.join("approvals.jsonl"))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

// ── Help / basic CLI ──────────────────────────────────────────────────────────

#[test]
fn binary_responds_to_help() {
    let tmp = TempDir::new().unwrap();
    let output = hookgate(tmp.path()).arg("--help").output().unwrap();
    assert!(output.status.success(), "hookgate --help should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hookgate"));
    assert!(stdout.contains("cache"), "help output should list cache subcommand");
}

#[test]
fn unknown_subcommand_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    let output = hookgate(tmp.path()).arg("nonexistent-subcommand").output().unwrap();
    assert!(!output.status.success());
}

// ── Hook mode ─────────────────────────────────────────────────────────────────

#[test]
fn read_is_allowed_as_read_only() {
    let tmp = TempDir::new().unwrap();
    let output = run_hook(
        tmp.path(),
        &envelope("s1", "Read", serde_json::json!({"file_path": "/etc/hosts"})),
    );

    assert!(output.status.success());
    let decision = decision_of(&output);
    assert_eq!(decision["hookEventName"], "PreToolUse");
    assert_eq!(decision["permissionDecision"], "allow");
    assert!(
        decision["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .contains("read-only")
    );

    let lines = log_lines(tmp.path());
    assert_eq!(lines.len(), 1);
    let entry: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(entry["tool"], "Read");
    assert_eq!(entry["cwd"], "/projects/demo");
    assert_eq!(entry["sessionId"], "s1");
}

#[test]
fn exit_plan_mode_asks() {
    let tmp = TempDir::new().unwrap();
    let output = run_hook(
        tmp.path(),
        &envelope("s1", "ExitPlanMode", serde_json::json!({"plan": "do things"})),
    );

    assert!(output.status.success());
    assert_eq!(decision_of(&output)["permissionDecision"], "ask");
}

#[test]
fn malformed_input_exits_one_with_diagnostic() {
    let tmp = TempDir::new().unwrap();
    let output = run_hook(tmp.path(), "this is not json");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "no envelope on failure");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid input envelope"), "stderr: {stderr}");
}

#[test]
fn unresolved_request_without_credentials_fails_loudly() {
    let tmp = TempDir::new().unwrap();
    let output = run_hook(
        tmp.path(),
        &envelope("s1", "Bash", serde_json::json!({"command": "rm -rf /"})),
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration"), "stderr: {stderr}");
    assert!(log_lines(tmp.path()).is_empty());
}

#[test]
fn uninterpretable_tool_input_has_no_opinion() {
    let tmp = TempDir::new().unwrap();
    let output = run_hook(tmp.path(), &envelope("s1", "Bash", serde_json::json!(42)));

    assert!(output.status.success());
    let decision = decision_of(&output);
    assert!(decision.get("permissionDecision").is_none());
}

#[test]
fn invalid_config_degrades_to_defaults() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.json"), "{ broken").unwrap();

    let output = run_hook(
        tmp.path(),
        &envelope("s1", "Grep", serde_json::json!({"pattern": "fn main"})),
    );
    assert!(output.status.success());
    assert_eq!(decision_of(&output)["permissionDecision"], "allow");
}

#[test]
fn log_can_be_disabled() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.json"), r#"{"log": false}"#).unwrap();

    let output = run_hook(
        tmp.path(),
        &envelope("s1", "Read", serde_json::json!({"file_path": "/etc/hosts"})),
    );
    assert!(output.status.success());
    assert!(!tmp.path().join("approvals.jsonl").exists());
}

#[test]
fn concurrent_invocations_each_log_one_line() {
    let tmp = TempDir::new().unwrap();
    let count = 16;

    let handles: Vec<_> = (0..count)
        .map(|i| {
            let home = tmp.path().to_path_buf();
            std::thread::spawn(move || {
                run_hook(
                    &home,
                    &envelope(
                        &format!("session-{i}"),
                        "Read",
                        serde_json::json!({"file_path": format!("/src/file_{i}.rs")}),
                    ),
                )
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().status.success());
    }

    let lines = log_lines(tmp.path());
    assert_eq!(lines.len(), count);
    for line in &lines {
        serde_json::from_str::<Value>(line).expect("every line is a complete entry");
    }
}

// ── Cache subcommands ─────────────────────────────────────────────────────────

#[test]
fn cache_clear_empties_the_store() {
    let tmp = TempDir::new().unwrap();
    let cache_path = tmp.path().join("cache.json");
    std::fs::write(
        &cache_path,
        r#"{"/w":{"abc":{"toolName":"Bash","toolInput":{},"decision":"allow","reason":"ok","timestamp":"2025-01-01T00:00:00Z"}}}"#,
    )
    .unwrap();

    let output = hookgate(tmp.path()).args(["cache", "clear"]).output().unwrap();
    assert!(output.status.success());

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&cache_path).unwrap()).unwrap();
    assert_eq!(on_disk, serde_json::json!({}));
}

#[test]
fn cache_path_prints_location() {
    let tmp = TempDir::new().unwrap();
    let output = hookgate(tmp.path()).args(["cache", "path"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim().ends_with("cache.json"));
}
