//! §8 scenario: a bash job that runs to completion reports success with
//! its stdout as output, against a mocked queue server and the real
//! compiled binary.

use crate::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn bash_job_completes_and_reports_output() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/links/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "linkId": "link-1" })))
        .expect(1..)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/links/link-1/heartbeat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/links/link-1/deregister"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/runner-config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refreshAfterSeconds": 300,
            "providers": {}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs/claim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "j1",
            "queueId": "q1",
            "harnessType": "bash",
            "inputData": { "command": "echo hello" },
            "execution": { "timeoutMs": 30000 },
            "attemptNumber": 1,
            "priority": 0
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs/claim"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs/j1/start"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs/j1/heartbeat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs/j1/complete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let args = RunnerArgs::new(server.uri());
    let mut child = args.spawn();

    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(SPEC_WAIT_MAX_MS);
    let mut completed = false;
    while std::time::Instant::now() < deadline {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.url.path() == "/v1/jobs/j1/complete") {
            completed = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }

    terminate(&mut child);

    assert!(completed, "expected the runner to report job j1 as complete");

    let requests = server.received_requests().await.expect("mock server has received requests");
    let complete_request = requests
        .iter()
        .find(|r| r.url.path() == "/v1/jobs/j1/complete")
        .expect("a complete request was sent");
    let body: serde_json::Value = complete_request.body_json().expect("complete body is JSON");
    let output = body["outputData"]["output"].as_str().unwrap_or_default();
    assert!(output.contains("hello"), "expected stdout to surface in output_data, got: {body}");
}
