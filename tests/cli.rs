//! Command-line behavior of the `wtype` binary
//!
//! Every case here fails before a keyboard is created, so no compositor is
//! needed. The environment is scrubbed so the user's session, log filter and
//! config file cannot leak in.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn wtype(args: &[&str], runtime_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wtype"))
        .args(args)
        .env_remove("WAYLAND_DISPLAY")
        .env_remove("WAYLAND_SOCKET")
        .env_remove("RUST_LOG")
        .env_remove("WTYPE_LOG")
        .env("XDG_RUNTIME_DIR", runtime_dir)
        .env("WTYPE_CONFIG", runtime_dir.join("missing.toml"))
        .output()
        .unwrap()
}

fn stderr_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_invalid_sleep_exits_with_one_diagnostic() {
    let dir = TempDir::new().unwrap();
    let output = wtype(&["-s", "abc"], dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let lines = stderr_lines(&output);
    assert_eq!(lines.len(), 1, "stderr: {:?}", lines);
    assert!(lines[0].contains("-s"));
    assert!(lines[0].contains("abc"));
}

#[test]
fn test_no_arguments_prints_usage() {
    let dir = TempDir::new().unwrap();
    let output = wtype(&[], dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr_lines(&output), vec!["Usage: wtype <text-to-type>"]);
}

#[test]
fn test_argument_errors_checked_before_connecting() {
    let dir = TempDir::new().unwrap();

    // With no compositor reachable, a connection attempt would report a
    // Wayland error instead of the argument problem
    for (args, expected) in [
        (&["-M", "meta"][..], "meta"),
        (&["-k", "NotAKey"][..], "NotAKey"),
        (&["-", "-"][..], "Stdin"),
    ] {
        let output = wtype(args, dir.path());
        assert_eq!(output.status.code(), Some(1), "args {:?}", args);

        let lines = stderr_lines(&output);
        assert_eq!(lines.len(), 1, "args {:?}: {:?}", args, lines);
        assert!(lines[0].contains(expected), "args {:?}: {:?}", args, lines);
    }
}

#[test]
fn test_missing_compositor_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let output = wtype(&["hello"], dir.path());

    assert_eq!(output.status.code(), Some(1));
    let lines = stderr_lines(&output);
    assert_eq!(lines.len(), 1, "stderr: {:?}", lines);
}
