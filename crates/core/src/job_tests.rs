// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::value::Value;

fn bare_job() -> Job {
    Job {
        id: JobId::new("j1"),
        queue_id: QueueId::new("q"),
        harness_type: "bash".to_string(),
        rendered_instruction: None,
        input_data: Default::default(),
        execution: None,
        attempt_number: 0,
        priority: 0,
    }
}

#[test]
fn default_timeout_is_ten_minutes() {
    let job = bare_job();
    assert_eq!(job.timeout(), DEFAULT_JOB_TIMEOUT);
    assert_eq!(job.timeout(), Duration::from_secs(600));
}

#[test]
fn explicit_timeout_overrides_default() {
    let mut job = bare_job();
    job.execution = Some(JobExecution {
        timeout_ms: Some(5000),
        ..Default::default()
    });
    assert_eq!(job.timeout(), Duration::from_millis(5000));
}

#[test]
fn working_directory_absent_by_default() {
    let job = bare_job();
    assert_eq!(job.working_directory(), None);
}

#[test]
fn working_directory_from_execution() {
    let mut job = bare_job();
    job.execution = Some(JobExecution {
        working_directory: Some(PathBuf::from("/tmp/work")),
        ..Default::default()
    });
    assert_eq!(job.working_directory(), Some(Path::new("/tmp/work")));
}

#[test]
fn environment_defaults_to_empty_map() {
    let job = bare_job();
    assert!(job.environment().is_empty());
}

#[test]
fn effective_harness_type_falls_back_to_top_level() {
    let job = bare_job();
    assert_eq!(job.effective_harness_type(), "bash");
}

#[test]
fn effective_harness_type_prefers_execution_override() {
    let mut job = bare_job();
    job.execution = Some(JobExecution {
        harness_type: Some("codex".to_string()),
        ..Default::default()
    });
    assert_eq!(job.effective_harness_type(), "codex");
}

#[test]
fn effective_harness_type_ignores_empty_override() {
    let mut job = bare_job();
    job.execution = Some(JobExecution {
        harness_type: Some(String::new()),
        ..Default::default()
    });
    assert_eq!(job.effective_harness_type(), "bash");
}

#[test]
fn display_name_uses_title_when_present() {
    let mut job = bare_job();
    job.input_data
        .insert("title".to_string(), Value::from("Fix the thing"));
    assert_eq!(job.display_name(), "Fix the thing");
}

#[test]
fn display_name_falls_back_to_id() {
    let job = bare_job();
    assert_eq!(job.display_name(), "j1");
}

#[test]
fn job_serde_roundtrip_uses_camel_case() {
    let job = bare_job();
    let json = serde_json::to_value(&job).unwrap();
    assert_eq!(json["queueId"], "q");
    assert_eq!(json["harnessType"], "bash");
    let back: Job = serde_json::from_value(json).unwrap();
    assert_eq!(back.id, job.id);
}

#[test]
fn job_deserializes_from_minimal_payload() {
    let json = serde_json::json!({
        "id": "j2",
        "queueId": "q",
        "harnessType": "codex",
        "inputData": {"prompt": "do the thing"}
    });
    let job: Job = serde_json::from_value(json).unwrap();
    assert_eq!(job.id, JobId::new("j2"));
    assert_eq!(job.attempt_number, 0);
    assert_eq!(
        job.input_data.get("prompt").and_then(Value::as_str),
        Some("do the thing")
    );
}
