//! Structured-data assertions.
//!
//! A bot step may assert key/value pairs against the JSON payload of the
//! reply. Keys are dotted paths (`intent.name`, `buttons.0.payload`); a
//! key without dots addresses a top-level field.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::types::Message;

/// The first assertion that did not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMismatch {
    /// Dotted path of the asserted key.
    pub key: String,
    /// Expected value.
    pub expected: Value,
    /// Actual value, `None` when the key is missing.
    pub actual: Option<Value>,
}

/// Get the structured payload of a reply.
///
/// Uses the reply's `source_data`, falling back to parsing its text as JSON.
#[must_use]
pub fn payload(message: &Message) -> Option<Cow<'_, Value>> {
    if let Some(data) = &message.source_data {
        return Some(Cow::Borrowed(data));
    }
    let text = message.message_text.trim();
    if !(text.starts_with('{') || text.starts_with('[')) {
        return None;
    }
    serde_json::from_str(text).ok().map(Cow::Owned)
}

/// Resolve a dotted path inside a JSON value.
///
/// An object key containing dots is matched verbatim before the path is split.
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(found) = value.as_object().and_then(|map| map.get(path)) {
        return Some(found);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Check every expected key against the actual payload.
///
/// Keys are checked in map order; the first missing or differing key is
/// returned. A missing payload fails on the first key.
pub fn check(expected: &Map<String, Value>, actual: Option<&Value>) -> Result<(), KeyMismatch> {
    for (key, want) in expected {
        let got = actual.and_then(|payload| lookup(payload, key));
        if got != Some(want) {
            return Err(KeyMismatch {
                key: key.clone(),
                expected: want.clone(),
                actual: got.cloned(),
            });
        }
    }
    Ok(())
}
