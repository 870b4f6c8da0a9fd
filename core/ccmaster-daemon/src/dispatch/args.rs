//! Small JSON argument-extraction helpers shared by every tool handler.
//!
//! Every `tools/call` argument bag arrives as a loosely typed
//! `serde_json::Value` (spec §4.H: "each dispatches on an `action`
//! discriminator"); these helpers turn "field missing or wrong type" into
//! one consistent `InvalidParams` error instead of each handler rolling its
//! own.

use serde_json::Value;

use crate::error::DaemonError;

pub fn require_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, DaemonError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| DaemonError::InvalidParams(format!("missing or non-string field: {field}")))
}

pub fn opt_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

pub fn opt_bool(args: &Value, field: &str) -> Option<bool> {
    args.get(field).and_then(Value::as_bool)
}

pub fn opt_u32(args: &Value, field: &str) -> Option<u32> {
    args.get(field).and_then(Value::as_u64).map(|v| v as u32)
}

pub fn str_list(args: &Value, field: &str) -> Vec<String> {
    args.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
