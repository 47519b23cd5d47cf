//! Remote fault shapes and their normalization into user-facing text.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Message shown when a fault cannot be reduced to one clear sentence.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Something went wrong. Please try again later or contact your system administrator";

/// A structured error returned by the remote procedure layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFault {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
}

impl RemoteFault {
    /// Creates a fault carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            exception_type: None,
        }
    }

    /// Best available description: message, then exception type.
    pub fn describe(&self) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or(self.exception_type.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
    }
}

/// Reduces an arbitrary remote error payload to a single readable message.
///
/// Accepts a string, `{ "body": { "message": .. } }`, `{ "body": [ { "message": .. } ] }`
/// or an array of those. When the payload holds zero or several distinct
/// messages, [`GENERIC_ERROR_MESSAGE`] is returned.
pub fn normalize_fault_message(input: &serde_json::Value) -> String {
    let mut messages = Vec::new();
    match input {
        serde_json::Value::Array(items) => {
            for item in items {
                messages.extend(pick_messages(item));
            }
        }
        other => messages.extend(pick_messages(other)),
    }

    let unique: BTreeSet<String> = messages
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if unique.len() != 1 {
        return GENERIC_ERROR_MESSAGE.to_string();
    }

    let msg = clean_message(unique.into_iter().next().unwrap_or_default());
    if msg.is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        msg
    }
}

fn pick_messages(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Object(map) => match map.get("body") {
            Some(serde_json::Value::Array(entries)) => entries
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
            Some(serde_json::Value::Object(body)) => body
                .get("message")
                .and_then(|m| m.as_str())
                .map(|m| vec![m.to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn is_code_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'
}

/// Strips a leading `CODE:` prefix (code of 3+ upper/digit/underscore chars).
fn strip_code_prefix(msg: &str) -> &str {
    let Some(colon) = msg.find(':') else {
        return msg;
    };
    let code = msg[..colon].trim_end();
    if code.len() >= 3 && code.chars().all(is_code_char) {
        msg[colon + 1..].trim_start()
    } else {
        msg
    }
}

/// Strips a trailing ` (CODE)` suffix.
fn strip_code_suffix(msg: &str) -> &str {
    let trimmed = msg.trim_end();
    if !trimmed.ends_with(')') {
        return msg;
    }
    let Some(open) = trimmed.rfind('(') else {
        return msg;
    };
    let code = &trimmed[open + 1..trimmed.len() - 1];
    if code.len() >= 3 && code.chars().all(is_code_char) {
        trimmed[..open].trim_end()
    } else {
        msg
    }
}

/// Drops custom-field suffixes (`Name__c` → `Name`).
fn strip_field_suffixes(msg: &str) -> String {
    msg.split(' ')
        .map(|word| {
            let core_end = word
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(word.len());
            let (core, rest) = word.split_at(core_end);
            let base = core
                .strip_suffix("__c")
                .or_else(|| core.strip_suffix("__r"))
                .filter(|b| !b.is_empty())
                .unwrap_or(core);
            format!("{base}{rest}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_message(raw: String) -> String {
    let msg = strip_code_prefix(&raw);
    let msg = strip_code_suffix(msg);
    let msg = strip_field_suffixes(msg).replace('_', " ");
    let msg = msg.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = msg.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => msg,
    }
}
