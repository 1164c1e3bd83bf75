// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration as StdDuration;

fn provider(status: &str, mcp_flag: bool, url: &str, token: &str) -> ProviderRecord {
    ProviderRecord {
        status: status.to_string(),
        flags: ProviderFlags { mcp: mcp_flag },
        mcp: ProviderMcp {
            url: url.to_string(),
        },
        credential: ProviderCredential {
            access_token: token.to_string(),
            token_type: default_token_type(),
            expires_at: None,
        },
    }
}

// --- §8 scenario 5: tool-config filter ---

#[test]
fn filter_excludes_non_mcp_provider() {
    let mut cfg = RunnerConfig::default();
    cfg.providers.insert(
        "github".to_string(),
        provider("active", false, "https://x", "tok"),
    );
    assert!(cfg.filtered_providers(SystemTime::now()).is_empty());
}

#[test]
fn filter_excludes_credential_expiring_within_skew() {
    let now = SystemTime::now();
    let mut jira = provider("active", true, "https://jira", "tok");
    jira.credential.expires_at = Some(DateTime::<Utc>::from(now) + chrono::Duration::seconds(10));
    let mut cfg = RunnerConfig::default();
    cfg.providers.insert("jira".to_string(), jira);
    assert!(cfg.filtered_providers(now).is_empty());
}

#[test]
fn filter_excludes_credential_expiring_at_exactly_30s() {
    // §8 boundary: "at exactly +30s it is excluded (strictly after-skew threshold)"
    let now = SystemTime::now();
    let mut provider = provider("active", true, "https://x", "tok");
    provider.credential.expires_at =
        Some(DateTime::<Utc>::from(now) + chrono::Duration::seconds(30));
    let mut cfg = RunnerConfig::default();
    cfg.providers.insert("x".to_string(), provider);
    assert!(cfg.filtered_providers(now).is_empty());
}

#[test]
fn filter_includes_credential_expiring_just_past_30s() {
    let now = SystemTime::now();
    let mut provider = provider("active", true, "https://x", "tok");
    provider.credential.expires_at =
        Some(DateTime::<Utc>::from(now) + chrono::Duration::seconds(31));
    let mut cfg = RunnerConfig::default();
    cfg.providers.insert("x".to_string(), provider);
    assert_eq!(cfg.filtered_providers(now).len(), 1);
}

#[test]
fn filter_includes_credential_expiring_ten_minutes_out() {
    let now = SystemTime::now();
    let mut linear = provider("active", true, "https://linear", "tok-linear");
    linear.credential.expires_at =
        Some(DateTime::<Utc>::from(now) + chrono::Duration::minutes(10));
    let mut cfg = RunnerConfig::default();
    cfg.providers.insert("linear".to_string(), linear);
    let specs = cfg.filtered_providers(now);
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].name, "linear");
}

#[test]
fn filter_scenario_five_exact_shape() {
    // §8 scenario 5: linear (eligible), github (no mcp flag), jira (expires
    // in 10s) -> only linear survives.
    let now = SystemTime::now();
    let mut cfg = RunnerConfig::default();

    let mut linear = provider("active", true, "https://linear.example", "tok-linear");
    linear.credential.expires_at =
        Some(DateTime::<Utc>::from(now) + chrono::Duration::minutes(10));
    cfg.providers.insert("linear".to_string(), linear);

    cfg.providers.insert(
        "github".to_string(),
        provider("active", false, "https://github.example", "tok-gh"),
    );

    let mut jira = provider("active", true, "https://jira.example", "tok-jira");
    jira.credential.expires_at = Some(DateTime::<Utc>::from(now) + chrono::Duration::seconds(10));
    cfg.providers.insert("jira".to_string(), jira);

    let specs = cfg.filtered_providers(now);
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].name, "linear");
}

#[test]
fn filter_excludes_empty_url_or_token() {
    let now = SystemTime::now();
    let mut cfg = RunnerConfig::default();
    cfg.providers
        .insert("a".to_string(), provider("active", true, "", "tok"));
    cfg.providers
        .insert("b".to_string(), provider("active", true, "https://x", ""));
    assert!(cfg.filtered_providers(now).is_empty());
}

#[test]
fn filter_allows_empty_status() {
    let now = SystemTime::now();
    let mut cfg = RunnerConfig::default();
    cfg.providers
        .insert("a".to_string(), provider("", true, "https://x", "tok"));
    assert_eq!(cfg.filtered_providers(now).len(), 1);
}

#[test]
fn filter_excludes_inactive_status() {
    let now = SystemTime::now();
    let mut cfg = RunnerConfig::default();
    cfg.providers.insert(
        "a".to_string(),
        provider("disabled", true, "https://x", "tok"),
    );
    assert!(cfg.filtered_providers(now).is_empty());
}

#[test]
fn filter_orders_lexicographically_by_name() {
    let now = SystemTime::now();
    let mut cfg = RunnerConfig::default();
    for name in ["zeta", "alpha", "mu"] {
        cfg.providers.insert(
            name.to_string(),
            provider("active", true, &format!("https://{name}"), "tok"),
        );
    }
    let names: Vec<_> = cfg
        .filtered_providers(now)
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["alpha", "mu", "zeta"]);
}

#[test]
fn token_type_lowercased_in_spec() {
    let now = SystemTime::now();
    let mut p = provider("active", true, "https://x", "tok");
    p.credential.token_type = "BASIC".to_string();
    let mut cfg = RunnerConfig::default();
    cfg.providers.insert("x".to_string(), p);
    let specs = cfg.filtered_providers(now);
    assert_eq!(specs[0].token_type, "basic");
}

// --- credential kind ---

#[test]
fn credential_kind_defaults_to_bearer() {
    let cred = ProviderCredential {
        access_token: "t".to_string(),
        token_type: default_token_type(),
        expires_at: None,
    };
    assert_eq!(cred.kind(), CredentialKind::Bearer);
    assert_eq!(cred.kind().header_scheme(), "Bearer");
}

#[test]
fn credential_kind_basic_case_insensitive() {
    let cred = ProviderCredential {
        access_token: "t".to_string(),
        token_type: "Basic".to_string(),
        expires_at: None,
    };
    assert_eq!(cred.kind(), CredentialKind::Basic);
    assert_eq!(cred.kind().header_scheme(), "Basic");
}

// --- §8 refresh interval normalization ---

#[test]
fn normalize_clamps_low_positive_values() {
    assert_eq!(normalize_refresh_seconds(1), REFRESH_INTERVAL_MIN_SECS);
    assert_eq!(normalize_refresh_seconds(59), REFRESH_INTERVAL_MIN_SECS);
}

#[test]
fn normalize_clamps_high_values() {
    assert_eq!(normalize_refresh_seconds(10_000), REFRESH_INTERVAL_MAX_SECS);
}

#[test]
fn normalize_non_positive_defaults() {
    assert_eq!(normalize_refresh_seconds(0), REFRESH_INTERVAL_DEFAULT_SECS);
    assert_eq!(normalize_refresh_seconds(-5), REFRESH_INTERVAL_DEFAULT_SECS);
}

#[test]
fn normalize_passes_through_in_range_values() {
    assert_eq!(normalize_refresh_seconds(300), 300);
    assert_eq!(normalize_refresh_seconds(60), 60);
    assert_eq!(normalize_refresh_seconds(900), 900);
}

#[test]
fn normalize_is_idempotent_for_a_range_of_inputs() {
    for raw in [-100, -1, 0, 1, 30, 59, 60, 61, 300, 899, 900, 901, 5000] {
        let once = normalize_refresh_seconds(raw);
        let twice = normalize_refresh_seconds(once as i64);
        assert_eq!(once, twice, "not idempotent for raw={raw}");
        assert!((60..=900).contains(&once));
    }
}

#[test]
fn runner_config_normalized_refresh_interval_is_a_duration() {
    let cfg = RunnerConfig {
        refresh_after_seconds: 45,
        providers: Default::default(),
    };
    assert_eq!(
        cfg.normalized_refresh_interval(),
        StdDuration::from_secs(60)
    );
}
