// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner config snapshot pushed periodically by the server (§3), and the
//! pure filter that turns it into an ordered `ProviderSpec` list for
//! tool-config injection (§4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Minimum time-in-the-future a credential's `expiresAt` must clear to be
/// eligible for inclusion (§3 filter invariant, §8 boundary behavior).
pub const CREDENTIAL_EXPIRY_SKEW_SECS: i64 = 30;

/// Server-hinted refresh interval bounds (§4.6 item 5).
pub const REFRESH_INTERVAL_MIN_SECS: u64 = 60;
pub const REFRESH_INTERVAL_MAX_SECS: u64 = 900;
pub const REFRESH_INTERVAL_DEFAULT_SECS: u64 = 300;

/// Periodic snapshot of provider credentials and flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    #[serde(default)]
    pub refresh_after_seconds: i64,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderRecord>,
}

impl RunnerConfig {
    /// Normalize `refresh_after_seconds` into the closed range
    /// `[60s, 900s]`, defaulting non-positive values to `300s` (§4.6 item
    /// 5, §8 "Normalizing a refresh interval is idempotent").
    pub fn normalized_refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(normalize_refresh_seconds(self.refresh_after_seconds))
    }

    /// Run the §3 filter invariant, producing providers in lexicographic
    /// name order so the resulting tool-config signature is deterministic.
    pub fn filtered_providers(&self, now: SystemTime) -> Vec<ProviderSpec> {
        let now: DateTime<Utc> = now.into();
        self.providers
            .iter()
            .filter(|(_, record)| record.is_eligible(now))
            .map(|(name, record)| record.to_spec(name, now))
            .collect()
    }
}

/// Clamp a raw refresh-interval hint into `[60, 900]`, treating
/// non-positive values as "unset" and defaulting to 300.
pub fn normalize_refresh_seconds(raw: i64) -> u64 {
    if raw <= 0 {
        return REFRESH_INTERVAL_DEFAULT_SECS;
    }
    (raw as u64).clamp(REFRESH_INTERVAL_MIN_SECS, REFRESH_INTERVAL_MAX_SECS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    /// Only `"active"` (or empty, per the filter invariant) participates.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub flags: ProviderFlags,
    pub mcp: ProviderMcp,
    pub credential: ProviderCredential,
}

impl ProviderRecord {
    /// §3 filter invariant: status empty or active, `flags.mcp` true,
    /// url/token non-empty, and not within 30s of expiry.
    fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        let status_ok = self.status.is_empty() || self.status == "active";
        let mcp_flag = self.flags.mcp;
        let url_ok = !self.mcp.url.is_empty();
        let token_ok = !self.credential.access_token.is_empty();
        let expiry_ok = match self.credential.expires_at {
            Some(expires_at) => expires_at - now > chrono::Duration::seconds(CREDENTIAL_EXPIRY_SKEW_SECS),
            None => true,
        };
        status_ok && mcp_flag && url_ok && token_ok && expiry_ok
    }

    fn to_spec(&self, name: &str, _now: DateTime<Utc>) -> ProviderSpec {
        ProviderSpec {
            name: name.to_string(),
            url: self.mcp.url.clone(),
            token_type: self.credential.token_type.to_lowercase(),
            token: self.credential.access_token.clone(),
            expires_at: self
                .credential
                .expires_at
                .map(|ts| ts.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFlags {
    #[serde(default)]
    pub mcp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMcp {
    #[serde(default)]
    pub url: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredential {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ProviderCredential {
    pub fn kind(&self) -> CredentialKind {
        if self.token_type.eq_ignore_ascii_case("basic") {
            CredentialKind::Basic
        } else {
            CredentialKind::Bearer
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Bearer,
    Basic,
}

impl CredentialKind {
    /// The HTTP `Authorization` header scheme (§4.6 item 3).
    pub fn header_scheme(self) -> &'static str {
        match self {
            CredentialKind::Bearer => "Bearer",
            CredentialKind::Basic => "Basic",
        }
    }
}

/// One provider entry derived from a `RunnerConfig` (§3).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    pub name: String,
    pub url: String,
    pub token_type: String,
    pub token: String,
    #[serde(default)]
    pub expires_at: String,
}

#[cfg(test)]
#[path = "runner_config_tests.rs"]
mod tests;
