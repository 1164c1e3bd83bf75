// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mush_core::job::{JobExecution, JobId, QueueId};
use mush_core::setup::SetupOptions;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn bare_job(rendered_instruction: &str) -> Job {
    Job {
        id: JobId::new("j1"),
        queue_id: QueueId::new("q"),
        harness_type: "bash".to_string(),
        rendered_instruction: Some(rendered_instruction.to_string()),
        input_data: Default::default(),
        execution: Some(JobExecution {
            timeout_ms: Some(5_000),
            environment: BTreeMap::from([("K".to_string(), "V".to_string())]),
            ..Default::default()
        }),
        attempt_number: 0,
        priority: 0,
    }
}

#[tokio::test]
async fn bash_happy_path_strips_trailing_newline() {
    let executor = EphemeralExecutor::shell("bash", "sh");
    let job = bare_job("echo hello");

    let result = executor.execute(&job).await.expect("job should succeed");

    assert!(result.success);
    assert_eq!(result.output, "hello");
    assert_eq!(result.stdout.as_deref(), Some("hello\n"));
    assert_eq!(result.exit_code, Some(0));
}

#[tokio::test]
async fn bash_non_zero_exit_reports_bash_error() {
    let executor = EphemeralExecutor::shell("bash", "sh");
    let job = bare_job("exit 3");

    let err = executor.execute(&job).await.expect_err("job should fail");

    assert_eq!(err.reason, "bash_error");
    assert!(err.message.contains("exited with code 3"));
    assert!(err.retry);
}

#[tokio::test]
async fn missing_payload_is_not_retryable() {
    let executor = EphemeralExecutor::shell("bash", "sh");
    let mut job = bare_job("");
    job.rendered_instruction = None;

    let err = executor.execute(&job).await.expect_err("job should fail");

    assert_eq!(err.reason, "command_error");
    assert!(!err.retry);
}

#[tokio::test]
async fn unknown_binary_is_not_retryable() {
    let executor = EphemeralExecutor::shell("bash", "definitely-not-a-real-binary-xyz");
    let job = bare_job("echo hi");

    let err = executor.execute(&job).await.expect_err("job should fail");

    assert_eq!(err.reason, "command_error");
}
