#![cfg(feature = "cdp")]

//! CLI failure paths. None of these reach the browser.

use assert_cmd::Command;
use std::fs;

fn mmdc() -> Command {
    Command::cargo_bin("mmdc").expect("binary built")
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn missing_arguments_exit_with_one() {
    let out = mmdc().output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("Missing required argument"));

    let out = mmdc().arg("diagram.mmd").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("<OUTPUT>"));
}

#[test]
fn png_to_stdout_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in.mmd");
    fs::write(&input, "graph TD\n  A --> B").unwrap();

    let out = mmdc().arg(&input).arg("png").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("PNG output to stdout not supported"));
    assert!(out.stdout.is_empty());
}

#[test]
fn empty_stdin_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("out.svg");

    let out = mmdc().arg("-").arg(&output).write_stdin("  \n").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("No input provided"));
    assert!(!output.exists());
}

#[test]
fn unreadable_input_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope.mmd");

    let out = mmdc().arg(&missing).arg("svg").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("Unable to read input"));
}

#[test]
fn unsupported_format_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in.mmd");
    fs::write(&input, "graph TD\n  A --> B").unwrap();

    let out = mmdc()
        .arg(&input)
        .arg(tmp.path().join("out.svg"))
        .args(["--format", "pdf"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("Unsupported output type 'pdf'"));
}

#[test]
fn config_file_must_be_an_object() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in.mmd");
    let config = tmp.path().join("config.json");
    fs::write(&input, "graph TD\n  A --> B").unwrap();
    fs::write(&config, "[\"dark\"]").unwrap();

    let out = mmdc()
        .arg(&input)
        .arg("svg")
        .arg("--config-file")
        .arg(&config)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("Invalid configuration"));
}

#[test]
fn bad_flag_values_exit_with_one() {
    let out = mmdc().args(["in.mmd", "out.png", "--width", "wide"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn help_exits_cleanly() {
    let out = mmdc().arg("--help").output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    let help = String::from_utf8_lossy(&out.stdout);
    assert!(help.contains("--resolution"));
    assert!(help.contains("--background"));
}
