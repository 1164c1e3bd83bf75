// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-key routing (§4.9 "Local keys"): a pure state machine over raw
//! input bytes, kept free of any actual I/O so it can be driven from
//! tests without a real terminal.

use std::time::{Duration, Instant};

const CTRL_C: u8 = 0x03;
const CTRL_Q: u8 = 0x11;
const CTRL_S: u8 = 0x13;
const ESC: u8 = 0x1b;

/// Ctrl-C's double-press window (§4.9).
pub const DOUBLE_PRESS_WINDOW: Duration = Duration::from_secs(2);

/// What the controller should do in response to one input byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the supervisor.
    Quit,
    /// Forward this byte to the active executor's input.
    Forward(u8),
    /// Swallow the byte; no forward, no quit.
    Swallow,
}

/// Tracks copy-mode and the Ctrl-C double-press window across calls.
#[derive(Debug, Default)]
pub struct KeyRouter {
    copy_mode: bool,
    last_ctrl_c: Option<Instant>,
    /// Set after an `ESC` while in copy mode, awaiting the byte that
    /// decides whether this was an arrow-key escape sequence.
    pending_escape: bool,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_copy_mode(&self) -> bool {
        self.copy_mode
    }

    /// Route one input byte. `has_active_persistent_job` gates Ctrl-C's
    /// "quit immediately" fast path (§4.9).
    pub fn handle_byte(&mut self, byte: u8, has_active_persistent_job: bool, now: Instant) -> Action {
        if self.pending_escape {
            self.pending_escape = false;
            if byte == b'[' || byte == b'O' {
                // Arrow-key escape sequence: stays in copy mode, passes through.
                return Action::Forward(byte);
            }
            // Any other byte: ESC genuinely exits copy mode, byte is swallowed
            // since it was the first byte of what would've been a new chord.
            self.copy_mode = false;
            return Action::Swallow;
        }

        match byte {
            CTRL_Q => Action::Quit,
            CTRL_C => self.handle_ctrl_c(has_active_persistent_job, now),
            CTRL_S => {
                self.copy_mode = !self.copy_mode;
                Action::Swallow
            }
            ESC if self.copy_mode => {
                self.pending_escape = true;
                Action::Swallow
            }
            _ if self.copy_mode => Action::Swallow,
            _ => Action::Forward(byte),
        }
    }

    fn handle_ctrl_c(&mut self, has_active_persistent_job: bool, now: Instant) -> Action {
        if !has_active_persistent_job {
            return Action::Quit;
        }
        let within_window = self
            .last_ctrl_c
            .is_some_and(|t| now.saturating_duration_since(t) <= DOUBLE_PRESS_WINDOW);
        if within_window {
            self.last_ctrl_c = None;
            return Action::Quit;
        }
        self.last_ctrl_c = Some(now);
        Action::Forward(CTRL_C)
    }
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
