use super::*;
use crate::session::{FakeSessionAdapter, SessionCall};
use mush_core::job::{JobExecution, JobId, QueueId};
use mush_core::Job;
use std::path::Path;

fn config(workdir: &Path) -> InteractiveConfig {
    InteractiveConfig {
        harness_name: "claude".to_string(),
        argv: vec!["claude".to_string()],
        working_directory: workdir.to_path_buf(),
    }
}

fn bare_job() -> Job {
    Job {
        id: JobId::new("job-1"),
        queue_id: QueueId::new("queue-1"),
        harness_type: "claude".to_string(),
        rendered_instruction: Some("hi".to_string()),
        input_data: Default::default(),
        execution: Some(JobExecution::default()),
        attempt_number: 0,
        priority: 0,
    }
}

#[tokio::test]
async fn setup_spawns_and_fires_ready_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = FakeSessionAdapter::new();
    let ready = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let ready_clone = ready.clone();
    let opts = SetupOptions {
        on_ready: Some(std::sync::Arc::new(move || {
            ready_clone.store(true, std::sync::atomic::Ordering::SeqCst)
        })),
        ..Default::default()
    };

    let executor = InteractiveExecutor::new(config(dir.path()), adapter, opts);
    executor.setup().await.unwrap();

    assert!(ready.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn execute_always_rejects_queued_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = FakeSessionAdapter::new();
    let executor = InteractiveExecutor::new(config(dir.path()), adapter, SetupOptions::default());
    executor.setup().await.unwrap();

    let err = executor.execute(&bare_job()).await.unwrap_err();
    assert_eq!(err.reason, "execution_error");
    assert!(err.message.contains("interactive mode"));
}

#[tokio::test]
async fn write_input_forwards_bytes_literally() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = FakeSessionAdapter::new();
    let executor = InteractiveExecutor::new(config(dir.path()), adapter.clone(), SetupOptions::default());
    executor.setup().await.unwrap();

    let receiver = executor.as_input_receiver().expect("should expose InputReceiver");
    receiver.write_input(b"ls -la\n").await.unwrap();

    let found = adapter.calls().into_iter().any(
        |c| matches!(c, SessionCall::SendLiteral { text, .. } if text == "ls -la\n"),
    );
    assert!(found);
}

#[tokio::test]
async fn teardown_closes_stdin_interrupts_then_kills() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = FakeSessionAdapter::new();
    let executor = InteractiveExecutor::new(config(dir.path()), adapter.clone(), SetupOptions::default());
    executor.setup().await.unwrap();

    executor.teardown().await;
    executor.teardown().await;

    let calls = adapter.calls();
    let kills = calls.iter().filter(|c| matches!(c, SessionCall::Kill { .. })).count();
    assert_eq!(kills, 1);

    let literals: Vec<String> = calls
        .into_iter()
        .filter_map(|c| match c {
            SessionCall::SendLiteral { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert!(literals.contains(&CLOSE_STDIN.to_string()));
    assert!(literals.contains(&INTERRUPT.to_string()));
}
