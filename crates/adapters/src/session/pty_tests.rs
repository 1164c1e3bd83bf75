// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

#[tokio::test]
async fn spawn_and_capture_echoed_output() {
    let adapter = PtyAdapter::new();
    let id = adapter
        .spawn("test", Path::new("/tmp"), "echo hello-pty", &[], 24, 80)
        .await
        .expect("spawn should succeed");

    // Give the reader thread a moment to drain the child's output.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let output = adapter
        .capture_output(&id, 10)
        .await
        .expect("capture should succeed");
    assert!(output.contains("hello-pty"), "output was: {output:?}");

    adapter.kill(&id).await.expect("kill should succeed");
}

#[tokio::test]
async fn is_alive_false_after_kill() {
    let adapter = PtyAdapter::new();
    let id = adapter
        .spawn("test", Path::new("/tmp"), "sleep 30", &[], 24, 80)
        .await
        .expect("spawn should succeed");

    assert!(adapter.is_alive(&id).await.unwrap());
    adapter.kill(&id).await.expect("kill should succeed");
    assert!(!adapter.is_alive(&id).await.unwrap());
}

#[tokio::test]
async fn operations_on_unknown_id_return_not_found() {
    let adapter = PtyAdapter::new();
    let err = adapter
        .send("missing", "hi")
        .await
        .expect_err("should not find session");
    assert!(matches!(err, SessionError::NotFound(_)));
}

#[test]
fn last_n_lines_truncates_to_the_requested_count() {
    let text = "a\nb\nc\nd\n";
    assert_eq!(last_n_lines(text, 2), "c\nd");
    assert_eq!(last_n_lines(text, 100), "a\nb\nc\nd");
}
