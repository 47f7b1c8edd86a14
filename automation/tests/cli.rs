//! CLI tests for the `automation` binary: stdout payloads and exit codes.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn automation(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_automation"))
        .args(args)
        .output()
        .expect("run automation")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn extract_branch_matches_auto_branch() {
    let output = automation(&["extract-branch", "auto/scatter-basic/matplotlib"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        r#"{"spec_id":"scatter-basic","library":"matplotlib","is_auto_branch":true}"#
    );
}

#[test]
fn extract_branch_prints_null_on_miss() {
    let output = automation(&["extract-branch", "main"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "null");
}

#[test]
fn extract_sub_issue() {
    let hit = automation(&["extract-sub-issue", "Parent work\nSub-Issue: #321"]);
    assert_eq!(hit.status.code(), Some(0));
    assert_eq!(stdout(&hit), "321");

    let miss = automation(&["extract-sub-issue", "no reference"]);
    assert_eq!(miss.status.code(), Some(1));
    assert_eq!(stdout(&miss), "");
}

#[test]
fn attempt_count_always_succeeds() {
    let output = automation(&["get-attempt-count", "ai-attempt-2,library:matplotlib"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "2");

    let none = automation(&["get-attempt-count", "ai-attempt-,bug"]);
    assert_eq!(none.status.code(), Some(0));
    assert_eq!(stdout(&none), "0");

    let large = automation(&["get-attempt-count", "ai-attempt-99999999999,ai-attempt-3"]);
    assert_eq!(large.status.code(), Some(0));
    assert_eq!(stdout(&large), "99999999999");
}

#[test]
fn parse_plot_path() {
    let output = automation(&[
        "parse-plot-path",
        "plots/seaborn/distribution/violin-basic/default.py",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        r#"{"library":"seaborn","spec_id":"violin-basic","variant":"default"}"#
    );

    let miss = automation(&["parse-plot-path", "README.md"]);
    assert_eq!(miss.status.code(), Some(1));
    assert_eq!(stdout(&miss), "null");
}

#[test]
fn status_transition() {
    let output = automation(&["status-transition", "status:queued,bug", "in-progress"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        "--remove-label status:queued --add-label status:in-progress"
    );

    let noop = automation(&["status-transition", "status:merged", "status:merged"]);
    assert_eq!(noop.status.code(), Some(0));
    assert_eq!(stdout(&noop), "");

    let unknown = automation(&["status-transition", "status:queued", "deployed"]);
    assert_eq!(unknown.status.code(), Some(1));
}

#[test]
fn quality_label() {
    for (score, label) in [
        ("95", "quality:excellent"),
        ("87", "quality:good"),
        ("50", "quality:poor"),
    ] {
        let output = automation(&["quality-label", score]);
        assert_eq!(output.status.code(), Some(0));
        assert_eq!(stdout(&output), label);
    }
    assert_eq!(
        automation(&["quality-label", "high"]).status.code(),
        Some(1)
    );
}

#[test]
fn strip_noqa_filters_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_automation"))
        .arg("strip-noqa")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn automation");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"from x import *  # noqa: F403\nprint(1)\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("output");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "from x import *\nprint(1)\n"
    );
}
