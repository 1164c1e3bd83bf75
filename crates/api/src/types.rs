// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire payloads for the link-registration family of calls (§4.10).
//!
//! Everything else the API surface needs (`Job`, `ExecResult`, `ExecError`,
//! `RunnerConfig`) already has a wire-ready type in `mush-core`.

use mush_core::value::ValueMap;
use serde::{Deserialize, Serialize};

/// Body of the startup `RegisterLink` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRegisterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub habitat_id: String,
    pub name: String,
    pub link_type: String,
    pub client_version: String,
    pub client_metadata: ClientMetadata,
}

impl LinkRegisterRequest {
    /// `linkType` is always `"agent"` (§4.10) — only this module ever
    /// constructs one, so the field is fixed here rather than threaded
    /// through as a parameter.
    pub fn new(
        instance_id: Option<String>,
        habitat_id: impl Into<String>,
        name: impl Into<String>,
        client_version: impl Into<String>,
        client_metadata: ClientMetadata,
    ) -> Self {
        Self {
            instance_id,
            habitat_id: habitat_id.into(),
            name: name.into(),
            link_type: "agent".to_string(),
            client_version: client_version.into(),
            client_metadata,
        }
    }
}

/// `clientMetadata` sub-object (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    pub hostname: String,
    pub os: String,
    pub arch: String,
}

impl ClientMetadata {
    /// Build from the running process's own `std::env::consts` and
    /// hostname, falling back to `"unknown-host"` per §4.10.
    pub fn detect(hostname: Option<String>) -> Self {
        Self {
            hostname: hostname.unwrap_or_else(|| "unknown-host".to_string()),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Response to `RegisterLink`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRegisterResponse {
    pub link_id: String,
}

/// Body of the teardown `DeregisterLink` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDeregisterRequest {
    pub reason: String,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
}

impl LinkDeregisterRequest {
    pub fn graceful_shutdown(jobs_completed: u64, jobs_failed: u64) -> Self {
        Self {
            reason: "graceful_shutdown".to_string(),
            jobs_completed,
            jobs_failed,
        }
    }
}

/// Body of `CompleteJob`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompleteJobRequest {
    pub output_data: ValueMap,
}
