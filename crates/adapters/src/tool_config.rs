// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-config injection (component F, §4.6): filter → sign → serialize
//! a credentialed provider list into the shape a persistent harness reads
//! its MCP server config from, with a pure change-detection signature so
//! the refresh loop only restarts a harness when the filtered set moved.
//!
//! Grounded on the teacher's `TmuxSessionConfig::configure` shape for "one
//! config artifact per session" and the write-new-file-then-point-at-it
//! swap used throughout the teacher's storage layer (no rename-over an
//! existing well-known path: each build gets its own unique temp path, and
//! the caller swaps which path it launches the harness with).

use mush_core::runner_config::CredentialKind;
use mush_core::{ProviderSpec, RunnerConfig};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Toml => "toml",
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolConfigError {
    #[error("serialize failed: {0}")]
    Serialize(String),
    #[error("io error on {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

/// A written tool-config file and the signature it was built from.
pub struct ToolConfigFile {
    pub path: PathBuf,
    pub signature: String,
}

/// SHA-256 hex digest over the JSON-serialized spec list (already in
/// lexicographic name order from `RunnerConfig::filtered_providers`),
/// §4.6 item 5's change-detection signature. Empty list yields an empty
/// signature and, per §8, no temp file is ever created for it.
pub fn signature(specs: &[ProviderSpec]) -> String {
    if specs.is_empty() {
        return String::new();
    }
    let serialized = serde_json::to_vec(specs).unwrap_or_default();
    hex_encode(&Sha256::digest(&serialized))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn credential_kind(token_type: &str) -> CredentialKind {
    if token_type.eq_ignore_ascii_case("basic") {
        CredentialKind::Basic
    } else {
        CredentialKind::Bearer
    }
}

fn render_json(specs: &[ProviderSpec]) -> Result<String, ToolConfigError> {
    let mut servers = serde_json::Map::new();
    for spec in specs {
        let scheme = credential_kind(&spec.token_type).header_scheme();
        servers.insert(
            spec.name.clone(),
            serde_json::json!({
                "type": "http",
                "url": spec.url,
                "headers": { "Authorization": format!("{scheme} {}", spec.token) },
            }),
        );
    }
    let root = serde_json::json!({ "mcpServers": servers });
    serde_json::to_string_pretty(&root).map_err(|e| ToolConfigError::Serialize(e.to_string()))
}

fn render_toml(specs: &[ProviderSpec]) -> Result<String, ToolConfigError> {
    let mut mcp_servers = toml::map::Map::new();
    for spec in specs {
        let scheme = credential_kind(&spec.token_type).header_scheme();

        let mut headers = toml::map::Map::new();
        headers.insert(
            "Authorization".to_string(),
            toml::Value::String(format!("{scheme} {}", spec.token)),
        );

        let mut server = toml::map::Map::new();
        server.insert("type".to_string(), toml::Value::String("http".to_string()));
        server.insert("url".to_string(), toml::Value::String(spec.url.clone()));
        server.insert("http_headers".to_string(), toml::Value::Table(headers));

        mcp_servers.insert(spec.name.clone(), toml::Value::Table(server));
    }

    let mut root = toml::map::Map::new();
    root.insert("mcp_servers".to_string(), toml::Value::Table(mcp_servers));

    toml::to_string_pretty(&toml::Value::Table(root))
        .map_err(|e| ToolConfigError::Serialize(e.to_string()))
}

/// Build the config body for `specs` without touching the filesystem.
/// `None` for an empty spec list (§4.6 item 4, §8 "empty filtered list
/// yields empty config bytes and empty signature and no temp file").
pub fn render(
    specs: &[ProviderSpec],
    format: Format,
) -> Result<Option<(String, String)>, ToolConfigError> {
    if specs.is_empty() {
        return Ok(None);
    }
    let body = match format {
        Format::Json => render_json(specs)?,
        Format::Toml => render_toml(specs)?,
    };
    Ok(Some((body, signature(specs))))
}

/// Run the §3 filter over `cfg`, serialize, and write a new, uniquely
/// named temp file with mode 0600. Returns `None` (no file written) for
/// an empty filtered list. On any error after the file is created, the
/// partial file is removed.
pub fn build_and_write(
    cfg: &RunnerConfig,
    format: Format,
    now: SystemTime,
) -> Result<Option<ToolConfigFile>, ToolConfigError> {
    let specs = cfg.filtered_providers(now);
    let Some((body, sig)) = render(&specs, format)? else {
        return Ok(None);
    };

    let suffix: u64 = rand::random();
    let path = std::env::temp_dir().join(format!(
        "mush-tool-config-{suffix:016x}.{}",
        format.extension()
    ));

    write_then_chmod(&path, body.as_bytes())?;
    Ok(Some(ToolConfigFile { path, signature: sig }))
}

fn write_then_chmod(path: &Path, bytes: &[u8]) -> Result<(), ToolConfigError> {
    let result = (|| -> std::io::Result<()> {
        std::fs::write(path, bytes)?;
        #[cfg(unix)]
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        Ok(())
    })();
    if let Err(e) = result {
        let _ = std::fs::remove_file(path);
        return Err(ToolConfigError::Io(path.to_path_buf(), e));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tool_config_tests.rs"]
mod tests;
