// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

#[test]
fn fire_ready_invokes_callback() {
    let called = Arc::new(AtomicBool::new(false));
    let called_clone = called.clone();
    let opts = SetupOptions {
        on_ready: Some(Arc::new(move || called_clone.store(true, Ordering::SeqCst))),
        ..Default::default()
    };
    opts.fire_ready();
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn fire_output_reaches_both_callback_and_terminal_sink() {
    struct RecordingSink(Mutex<Vec<u8>>);
    impl TerminalSink for RecordingSink {
        fn write(&self, bytes: &[u8]) {
            self.0.lock().unwrap().extend_from_slice(bytes);
        }
    }

    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let lines_clone = lines.clone();
    let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));

    let opts = SetupOptions {
        terminal: Some(sink.clone()),
        on_output: Some(Arc::new(move |line: &str| {
            lines_clone.lock().unwrap().push(line.to_string());
        })),
        ..Default::default()
    };

    opts.fire_output("hello");

    assert_eq!(lines.lock().unwrap().as_slice(), ["hello".to_string()]);
    assert_eq!(sink.0.lock().unwrap().as_slice(), b"hello");
}

#[test]
fn fire_exit_invokes_callback_with_code() {
    let code = Arc::new(AtomicI32::new(-1));
    let code_clone = code.clone();
    let opts = SetupOptions {
        on_exit: Some(Arc::new(move |c| code_clone.store(c, Ordering::SeqCst))),
        ..Default::default()
    };
    opts.fire_exit(7);
    assert_eq!(code.load(Ordering::SeqCst), 7);
}

#[test]
fn no_callbacks_is_a_safe_default() {
    let opts = SetupOptions::default();
    opts.fire_ready();
    opts.fire_output("noop");
    opts.fire_exit(0);
}

#[test]
fn pty_size_falls_back_to_defaults_when_unset() {
    let opts = SetupOptions::default();
    assert_eq!(opts.pty_size(), (DEFAULT_PTY_ROWS, DEFAULT_PTY_COLS));
}

#[test]
fn pty_size_honors_explicit_rows_and_cols() {
    let opts = SetupOptions {
        rows: 40,
        cols: 120,
        ..Default::default()
    };
    assert_eq!(opts.pty_size(), (40, 120));
}

#[test]
fn tee_bytes_writes_to_the_terminal_sink_without_touching_on_output() {
    struct RecordingSink(Mutex<Vec<u8>>);
    impl TerminalSink for RecordingSink {
        fn write(&self, bytes: &[u8]) {
            self.0.lock().unwrap().extend_from_slice(bytes);
        }
    }

    let on_output_called = Arc::new(AtomicBool::new(false));
    let on_output_clone = on_output_called.clone();
    let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));

    let opts = SetupOptions {
        terminal: Some(sink.clone()),
        on_output: Some(Arc::new(move |_: &str| {
            on_output_clone.store(true, Ordering::SeqCst)
        })),
        ..Default::default()
    };

    opts.tee_bytes(b"raw bytes");

    assert_eq!(sink.0.lock().unwrap().as_slice(), b"raw bytes");
    assert!(!on_output_called.load(Ordering::SeqCst));
}
