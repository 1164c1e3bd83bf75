// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifiers and the claimed-job payload.

use crate::value::ValueMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

crate::define_id! {
    /// Opaque identifier for a claimed job.
    pub struct JobId;
}

crate::define_id! {
    /// Identifier of the queue a job was claimed from.
    pub struct QueueId;
}

/// Default job execution timeout when `execution.timeoutMs` is absent (§4.7).
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(600);

/// Per-job execution parameters, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: std::collections::BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness_type: Option<String>,
}

impl JobExecution {
    /// The execution timeout, defaulting to 10 minutes per §4.7.
    pub fn timeout(&self) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_JOB_TIMEOUT)
    }
}

/// One unit of work claimed from the queue (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub queue_id: QueueId,
    pub harness_type: String,
    /// Authoritative, server-prepared payload. Preferred over `input_data`
    /// fallback fields wherever the harness accepts it (§4.2 step 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_instruction: Option<String>,
    /// Permissive fallback payload (`command`, `script`, `prompt`,
    /// `instruction`, `title`, `description`, ...).
    #[serde(default)]
    pub input_data: ValueMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<JobExecution>,
    #[serde(default)]
    pub attempt_number: u32,
    #[serde(default)]
    pub priority: i32,
}

impl Job {
    /// Job-relative working directory, if set.
    pub fn working_directory(&self) -> Option<&Path> {
        self.execution
            .as_ref()
            .and_then(|e| e.working_directory.as_deref())
    }

    /// Job-specific environment overlay (merged over the process env).
    pub fn environment(&self) -> &std::collections::BTreeMap<String, String> {
        static EMPTY: std::sync::OnceLock<std::collections::BTreeMap<String, String>> =
            std::sync::OnceLock::new();
        self.execution
            .as_ref()
            .map(|e| &e.environment)
            .unwrap_or_else(|| EMPTY.get_or_init(Default::default))
    }

    /// Execution timeout, defaulting to 10 minutes when unset (§4.7).
    pub fn timeout(&self) -> Duration {
        self.execution
            .as_ref()
            .map(JobExecution::timeout)
            .unwrap_or(DEFAULT_JOB_TIMEOUT)
    }

    /// Harness selector: `execution.harnessType` overrides the top-level
    /// `harnessType` when both are present, since `execution` is assembled
    /// later in the pipeline and is allowed to refine the dispatch target.
    pub fn effective_harness_type(&self) -> &str {
        self.execution
            .as_ref()
            .and_then(|e| e.harness_type.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.harness_type)
    }

    /// Best-effort display name for logging and injected env vars
    /// (`MUSH_JOB_NAME`). Falls back to the job id when no title is present.
    pub fn display_name(&self) -> String {
        self.input_data
            .get("title")
            .and_then(crate::value::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
