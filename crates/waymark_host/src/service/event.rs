//! Events
//!
//! Fire-and-forget notifications on the manager's broadcast bus. The host
//! uses them to poke services it holds no reference to, and services use
//! them to announce what they did.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A notification on the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Slash-separated type, e.g. "surface/reloaded"
    pub event_type: String,
    /// Service id or host component that published it
    pub source: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Unix time in milliseconds
    pub timestamp: u64,
}

impl Event {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            data,
            timestamp: unix_millis(),
        }
    }

    /// An event with no payload
    pub fn now(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(event_type, source, serde_json::Value::Null)
    }

    /// Test against a subscription pattern (`a/b`, `a/*` or `*`)
    pub fn matches(&self, pattern: &str) -> bool {
        pattern_matches(pattern, &self.event_type)
    }

    /// String field of an object payload
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key)?.as_str()
    }
}

pub(crate) fn pattern_matches(pattern: &str, event_type: &str) -> bool {
    match pattern.strip_suffix('*') {
        None => pattern == event_type,
        Some("") => true,
        Some(prefix) => prefix.ends_with('/') && event_type.starts_with(prefix),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
