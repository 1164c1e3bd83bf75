// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_is_disconnected() {
    assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
}

#[test]
fn connected_and_processing_are_operational() {
    assert!(ConnectionStatus::Connected.is_operational());
    assert!(ConnectionStatus::Processing.is_operational());
}

#[test]
fn ready_is_not_yet_operational() {
    assert!(!ConnectionStatus::Ready.is_operational());
    assert!(!ConnectionStatus::Error.is_operational());
}

#[test]
fn display_matches_wire_token() {
    assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
    assert_eq!(ConnectionStatus::Processing.to_string(), "processing");
}

#[test]
fn serde_uses_snake_case_tokens() {
    let json = serde_json::to_value(ConnectionStatus::Starting).unwrap();
    assert_eq!(json, "starting");
    let back: ConnectionStatus = serde_json::from_value(json).unwrap();
    assert_eq!(back, ConnectionStatus::Starting);
}
