// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::process::Command;

#[tokio::test]
async fn run_with_timeout_success() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn run_with_timeout_nonzero_exit_is_not_an_error() {
    let cmd = Command::new("false");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "false")
        .await
        .unwrap();
    assert!(!output.status.success());
}

#[tokio::test]
async fn run_with_timeout_io_error() {
    let cmd = Command::new("/nonexistent/binary");
    let result = run_with_timeout(cmd, Duration::from_secs(5), "nonexistent").await;
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.starts_with("nonexistent failed:"), "got: {}", err);
}

#[tokio::test]
async fn run_with_timeout_timeout_elapsed() {
    let mut cmd = Command::new("sleep");
    cmd.arg("10");
    let result = run_with_timeout(cmd, Duration::from_millis(100), "test sleep").await;
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.contains("timed out"), "got: {}", err);
    assert!(err.contains("test sleep"), "got: {}", err);
}

#[tokio::test]
async fn run_with_timeout_tee_streams_to_the_sink_and_still_buffers() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo out-line; echo err-line 1>&2");

    let seen: std::sync::Arc<parking_lot::Mutex<Vec<u8>>> = Default::default();
    let seen_clone = seen.clone();
    let tee = move |bytes: &[u8]| seen_clone.lock().extend_from_slice(bytes);
    let tee: &(dyn Fn(&[u8]) + Send + Sync) = &tee;

    let output = run_with_timeout_tee(cmd, Duration::from_secs(5), "sh", Some(tee))
        .await
        .unwrap();

    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out-line");
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err-line");

    let teed = String::from_utf8_lossy(&seen.lock()).into_owned();
    assert!(teed.contains("out-line"));
    assert!(teed.contains("err-line"));
}

#[tokio::test]
async fn run_with_timeout_tee_without_a_sink_matches_run_with_timeout() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");
    let output = run_with_timeout_tee(cmd, Duration::from_secs(5), "echo", None)
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}
