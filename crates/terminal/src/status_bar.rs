// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status bar line rendering (§4.9). Two lines, each padded to terminal
//! width with a single attribute-reset byte at line end; escape sequences
//! are never counted toward the visible-length pad computation.

use mush_core::ConnectionStatus;
use std::time::Duration;

const RESET: &str = "\x1b[0m";

mod codes {
    pub const GREEN: u8 = 40;
    pub const CYAN: u8 = 80;
    pub const YELLOW: u8 = 220;
    pub const RED: u8 = 196;
    pub const GREY: u8 = 240;
}

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

fn status_color(status: ConnectionStatus) -> u8 {
    match status {
        ConnectionStatus::Connected | ConnectionStatus::Ready => codes::GREEN,
        ConnectionStatus::Processing => codes::CYAN,
        ConnectionStatus::Connecting | ConnectionStatus::Starting => codes::YELLOW,
        ConnectionStatus::Error => codes::RED,
        ConnectionStatus::Disconnected => codes::GREY,
    }
}

/// Local-key mode shown in the status bar (§4.9 "Mode: <LIVE|COPY>").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Copy,
}

impl Mode {
    fn label(self) -> &'static str {
        match self {
            Mode::Live => "LIVE",
            Mode::Copy => "COPY",
        }
    }
}

/// Snapshot of everything the two status-bar lines are rendered from.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub habitat_id: String,
    pub status: ConnectionStatus,
    pub mode: Mode,
    pub job_id: Option<String>,
    pub heartbeat_age: Option<Duration>,
    pub queue_id: String,
    pub done: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

/// Visible length of `s`, ignoring ANSI escape sequences (§4.9).
fn visible_len(s: &str) -> usize {
    mush_adapters::ansi::strip(s).chars().count()
}

/// Pad `s` with spaces to `width` visible columns, then append a reset.
/// If `s` is already at or past `width`, it's truncated at a visible-length
/// boundary before padding so the line never wraps.
fn pad_line(s: &str, width: usize) -> String {
    let visible = visible_len(s);
    if visible >= width {
        return format!("{s}{RESET}");
    }
    let padding = " ".repeat(width - visible);
    format!("{s}{padding}{RESET}")
}

/// Ellipsize `s` to at most `max_chars`, appending `...` when truncated
/// (§4.9 "first 40 chars, ellipsized").
fn ellipsize(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

fn format_age(age: Option<Duration>) -> String {
    match age {
        Some(d) => mush_core::format_elapsed(d.as_secs()),
        None => "never".to_string(),
    }
}

/// Line 1: `MUSH HARNESS | Habitat: <id> | Status: <colored> | Mode:
/// <LIVE|COPY> | Job: <id|"(waiting...)">`.
pub fn render_line1(snapshot: &StatusSnapshot, width: usize) -> String {
    let color = fg256(status_color(snapshot.status));
    let job = snapshot.job_id.as_deref().unwrap_or("(waiting...)");
    let line = format!(
        "MUSH HARNESS | Habitat: {} | Status: {color}{}{RESET} | Mode: {} | Job: {job}",
        snapshot.habitat_id,
        snapshot.status,
        snapshot.mode.label(),
    );
    pad_line(&line, width)
}

/// Line 2: `HB: <age> | Queue ID: <id> | Done: <n> | Failed: <n>`, plus a
/// trailing `Error: <...>` when `last_error` is set.
pub fn render_line2(snapshot: &StatusSnapshot, width: usize) -> String {
    let mut line = format!(
        "HB: {} | Queue ID: {} | Done: {} | Failed: {}",
        format_age(snapshot.heartbeat_age),
        snapshot.queue_id,
        snapshot.done,
        snapshot.failed,
    );
    if let Some(error) = &snapshot.last_error {
        line.push_str(&format!(" | Error: {}", ellipsize(error, 40)));
    }
    pad_line(&line, width)
}

#[cfg(test)]
#[path = "status_bar_tests.rs"]
mod tests;
