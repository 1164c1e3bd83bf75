//! §7 "Setup-time failures terminate the process": an unregistered
//! harness name must fail fast rather than start polling the queue.

use crate::prelude::*;
use wiremock::MockServer;

#[tokio::test]
async fn unknown_harness_exits_nonzero_quickly() {
    let server = MockServer::start().await;

    let args = RunnerArgs::new(server.uri()).harnesses("nonexistent-harness");
    let mut child = args.spawn();

    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(SPEC_WAIT_MAX_MS);
    let mut status = None;
    while std::time::Instant::now() < deadline {
        if let Ok(Some(s)) = child.try_wait() {
            status = Some(s);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }

    if status.is_none() {
        terminate(&mut child);
    }

    let status = status.expect("mush should exit on its own for an unregistered harness");
    assert!(!status.success(), "expected a non-zero exit status, got {status:?}");

    assert!(
        server.received_requests().await.unwrap_or_default().is_empty(),
        "setup failure must not reach the queue API at all"
    );
}
