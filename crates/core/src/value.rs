// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamically typed value tree backing `Job.inputData` and
//! `ExecResult.outputData`.
//!
//! The wire format for these fields is heterogeneous (string, int, bool,
//! null, list, map) with no closed schema. Rather than reinvent a JSON
//! tree, this wraps `serde_json::Value` and adds the handful of
//! defensive per-key accessors the executors need (§9 "Dynamic payload
//! typing").

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single dynamically typed value, or a map of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub serde_json::Value);

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.0.as_bool()
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(serde_json::Value::String(s))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(serde_json::Value::String(s.to_string()))
    }
}

/// A string-keyed map of dynamically typed values.
///
/// `BTreeMap` (not `HashMap`) so any serialized form (tool-config specs,
/// logged payloads) is deterministic, matching the lexicographic-order
/// invariant the tool-config builder requires (§4.6).
pub type ValueMap = BTreeMap<String, Value>;

/// Read a string field from a value map, trying each key in order and
/// returning the first present, non-empty match.
///
/// Models the `inputData` fallback-field lookup in §4.2/§4.3: a job may
/// carry its payload under any of several conventional keys.
pub fn first_string_field<'a>(map: &'a ValueMap, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
