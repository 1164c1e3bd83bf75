// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The terminal controller (component I, §4.9): raw mode, a reserved
//! status-bar region, a DECSTBM scroll region beneath it, and local-key
//! routing. Built on `crossterm` the way `unicity-astrid-astrid`'s TUI
//! enters/leaves raw mode, but driving the screen with hand-written
//! escape sequences instead of a widget framework — this is a scroll
//! region feeding a child PTY's raw bytes through, not a redrawn UI.

use crate::geometry::{clamp_size, cursor_to_sequence, scroll_region_sequence, STATUS_BAR_HEIGHT};
use crate::keys::{Action, KeyRouter};
use crate::sink::StdoutSink;
use crate::status_bar::{render_line1, render_line2, Mode, StatusSnapshot};
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures_util::StreamExt;
use mush_adapters::{InputReceiver, Resizable};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Resize reconciliation tick (§4.9 "on a 250 ms reconciliation timer").
const RESIZE_RECONCILE_INTERVAL: Duration = Duration::from_millis(250);
/// Status-bar repaint tick (§4.9 "on a 1 Hz tick").
const STATUS_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies the live data the status bar renders and the active PTY's
/// input sink, kept out of this crate so it doesn't depend on
/// `mush-engine`'s concrete state type.
pub trait StatusSource: Send + Sync {
    fn snapshot(&self, mode: Mode) -> StatusSnapshot;
    fn has_active_persistent_job(&self) -> bool;
}

/// Map a crossterm key event onto the raw control byte a real terminal
/// would have sent in cooked-off raw mode (Ctrl-<letter> => `letter & 0x1f`).
fn key_to_byte(code: KeyCode, modifiers: KeyModifiers) -> Option<u8> {
    match code {
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => {
            Some((c.to_ascii_uppercase() as u8) & 0x1f)
        }
        KeyCode::Char(c) => Some(c as u8),
        KeyCode::Esc => Some(0x1b),
        _ => None,
    }
}

pub struct TerminalController {
    sink: StdoutSink,
    resizables: Vec<Arc<dyn Resizable>>,
    source: Arc<dyn StatusSource>,
    size: parking_lot::Mutex<(u16, u16)>,
    router: parking_lot::Mutex<KeyRouter>,
    active_input: parking_lot::Mutex<Option<Arc<dyn InputReceiver>>>,
}

impl TerminalController {
    pub fn new(source: Arc<dyn StatusSource>, sink: StdoutSink) -> Self {
        Self {
            sink,
            resizables: Vec::new(),
            source,
            size: parking_lot::Mutex::new((80, 24)),
            router: parking_lot::Mutex::new(KeyRouter::new()),
            active_input: parking_lot::Mutex::new(None),
        }
    }

    pub fn sink(&self) -> StdoutSink {
        self.sink.clone()
    }

    pub fn register_resizable(&mut self, resizable: Arc<dyn Resizable>) {
        self.resizables.push(resizable);
    }

    /// Switch which executor's input stdin bytes get forwarded to (§4.9
    /// "route stdin keys to local handlers or the active executor").
    pub fn set_active_input(&self, receiver: Option<Arc<dyn InputReceiver>>) {
        *self.active_input.lock() = receiver;
    }

    fn enter(&self) -> Result<(), TerminalError> {
        terminal::enable_raw_mode()?;
        let (cols, rows) = terminal::size()?;
        self.apply_size(cols, rows);
        Ok(())
    }

    fn leave(&self) {
        // Restore a full-screen scroll region so the shell that regains
        // control of the terminal isn't left with ours.
        if let Ok((_, rows)) = terminal::size() {
            self.sink.write_raw(format!("\x1b[1;{rows}r").as_bytes());
        }
        let _ = terminal::disable_raw_mode();
    }

    fn apply_size(&self, cols: u16, rows: u16) {
        let (cols, rows) = clamp_size(cols, rows);
        {
            let mut current = self.size.lock();
            if *current == (cols, rows) {
                return;
            }
            *current = (cols, rows);
        }
        self.sink.write_raw(scroll_region_sequence(rows).as_bytes());
        for resizable in &self.resizables {
            resizable.resize(rows.saturating_sub(STATUS_BAR_HEIGHT), cols);
        }
        self.render_status_bar();
    }

    fn render_status_bar(&self) {
        let (cols, _) = *self.size.lock();
        let mode = if self.router.lock().is_copy_mode() {
            Mode::Copy
        } else {
            Mode::Live
        };
        let snapshot = self.source.snapshot(mode);
        let mut out = Vec::new();
        out.extend_from_slice(cursor_to_sequence(1, 1).as_bytes());
        out.extend_from_slice(render_line1(&snapshot, cols as usize).as_bytes());
        out.extend_from_slice(cursor_to_sequence(2, 1).as_bytes());
        out.extend_from_slice(render_line2(&snapshot, cols as usize).as_bytes());
        self.sink.write_raw(&out);
    }

    async fn forward_byte(&self, byte: u8) {
        let receiver = self.active_input.lock().clone();
        if let Some(receiver) = receiver {
            if let Err(e) = receiver.write_input(&[byte]).await {
                warn!(error = %e, "failed forwarding input byte to executor");
            }
        }
    }

    /// Drive raw mode, resize reconciliation, the 1 Hz status repaint, and
    /// local-key routing until `cancel` fires or a local key quits.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TerminalError> {
        self.enter()?;
        let result = self.run_loop(cancel).await;
        self.leave();
        result
    }

    async fn run_loop(&self, cancel: CancellationToken) -> Result<(), TerminalError> {
        let mut events = EventStream::new();
        let mut resize_ticker = tokio::time::interval(RESIZE_RECONCILE_INTERVAL);
        let mut status_ticker = tokio::time::interval(STATUS_TICK_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = resize_ticker.tick() => {
                    if let Ok((cols, rows)) = terminal::size() {
                        self.apply_size(cols, rows);
                    }
                }
                _ = status_ticker.tick() => self.render_status_bar(),
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Resize(cols, rows))) => self.apply_size(cols, rows),
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            if let Some(byte) = key_to_byte(key.code, key.modifiers) {
                                let has_job = self.source.has_active_persistent_job();
                                let action = self.router.lock().handle_byte(byte, has_job, Instant::now());
                                match action {
                                    Action::Quit => return Ok(()),
                                    Action::Forward(b) => self.forward_byte(b).await,
                                    Action::Swallow => {}
                                }
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => warn!(error = %e, "terminal event stream error"),
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
