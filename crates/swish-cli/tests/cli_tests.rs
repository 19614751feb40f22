//! End-to-end tests for the `swish` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn swish() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_swish"));
    // Keep the user's config out of the tests.
    cmd.env("XDG_CONFIG_HOME", env!("CARGO_TARGET_TMPDIR"));
    cmd
}

fn run_c(line: &str) -> Output {
    swish()
        .args(["-c", line])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run swish")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// Single commands
// ============================================================================

#[test]
fn single_command_writes_to_inherited_stdout() {
    let output = run_c("echo hi");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn single_command_reads_inherited_stdin() {
    let mut child = swish()
        .args(["-c", "cat"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn swish");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"straight through\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "straight through\n");
}

#[test]
fn quoted_argument_stays_one_word() {
    let output = run_c("printf '%s\\n' 'a b' c");
    assert_eq!(stdout(&output), "a b\nc\n");
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn two_stage_pipeline() {
    let output = run_c("echo hi | cat");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn stdin_flows_through_every_stage() {
    let mut child = swish()
        .args(["-c", "cat | cat | tr a-z A-Z | cat"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn swish");

    let mut stdin = child.stdin.take().unwrap();
    let writer = std::thread::spawn(move || {
        for i in 0..5000 {
            writeln!(stdin, "line {i}").unwrap();
        }
    });

    let output = child.wait_with_output().unwrap();
    writer.join().unwrap();

    let expected: String = (0..5000).map(|i| format!("LINE {i}\n")).collect();
    assert_eq!(stdout(&output), expected);
}

#[test]
fn pipe_inside_a_word_is_not_a_delimiter() {
    let output = run_c("echo a|b");
    assert_eq!(stdout(&output), "a|b\n");
}

#[test]
fn early_exit_downstream_terminates_upstream() {
    let output = run_c("yes | head -n 2");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "y\ny\n");
}

// ============================================================================
// Segment failures
// ============================================================================

#[test]
fn missing_program_reports_but_pipeline_succeeds() {
    let output = run_c("swish_missing_program_91c2 | cat");
    assert!(output.status.success());
    assert!(
        stderr(&output).contains("swish: swish_missing_program_91c2"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn empty_segment_is_reported_by_that_segment() {
    let output = run_c("echo hi | | cat");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
    assert!(stderr(&output).contains("empty command"), "stderr: {}", stderr(&output));
}

#[test]
fn unterminated_quote_fails_the_launch() {
    let output = run_c("echo 'oops | cat");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unterminated"));
}

// ============================================================================
// Scripts, config, arguments
// ============================================================================

#[test]
fn script_runs_every_line() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("test.swish");
    std::fs::write(
        &script,
        "#!/usr/bin/env swish\n# comment\necho one\n\necho two | cat\n",
    )
    .unwrap();

    let output = swish().arg(&script).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "one\ntwo\n");
}

#[test]
fn script_with_bad_line_fails_but_continues() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bad.swish");
    std::fs::write(&script, "echo 'open\necho after\n").unwrap();

    let output = swish().arg(&script).output().unwrap();
    assert!(!output.status.success());
    assert_eq!(stdout(&output), "after\n");
    assert!(stderr(&output).contains(":1:"));
}

#[test]
fn explicit_config_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("swish.toml");
    std::fs::write(&config, "reap = \"per-segment\"\n").unwrap();

    let output = swish()
        .args(["--config", config.to_str().unwrap(), "-c", "echo cfg | cat"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "cfg\n");
}

#[test]
fn invalid_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("swish.toml");
    std::fs::write(&config, "reap = \"sometimes\"\n").unwrap();

    let output = swish()
        .arg(format!("--config={}", config.display()))
        .args(["-c", "true"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to parse config"));
}

#[test]
fn no_arguments_prints_usage() {
    let output = swish().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn version_flag() {
    let output = swish().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("swish "));
}
