// Event classifier / formatter
//
// Turns a tracker emission carrying an event tag into a severity-tagged,
// human-readable log entry and prepends it to a capped log. The log keeps
// only the newest EVENT_LOG_CAPACITY entries; older ones are dropped
// silently.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{EventPayload, TrackerMessage};

/// Entries retained by the event log
pub const EVENT_LOG_CAPACITY: usize = 50;

/// Severity class of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl Severity {
    /// Classify a raw event tag.
    ///
    /// First matching rule wins, case-sensitive substring match:
    /// 1. "outside" or "exit" → Warning
    /// 2. "instability" → Error
    /// 3. "occupied" or "detected" → Success
    /// 4. otherwise → Info
    pub fn classify(tag: &str) -> Self {
        if tag.contains("outside") || tag.contains("exit") {
            Severity::Warning
        } else if tag.contains("instability") {
            Severity::Error
        } else if tag.contains("occupied") || tag.contains("detected") {
            Severity::Success
        } else {
            Severity::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Success => "success",
        }
    }
}

/// Human-readable title for an event tag: underscores become spaces and the
/// first letter of every word is upper-cased (`limb_outside_bed` →
/// `Limb Outside Bed`).
///
/// A word is a run of ASCII letters, digits or underscores.
pub fn format_event_message(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut prev_is_word = false;
    for ch in tag.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let is_word = ch.is_ascii_alphanumeric();
        if is_word && !prev_is_word {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        prev_is_word = is_word;
    }
    out
}

/// `key: value` for every present payload field, joined with ` | `.
///
/// Fields appear in the order the producer sent them; sequence values are
/// joined with `, `. Null fields are skipped and no payload gives an empty
/// string.
pub fn format_event_details(payload: Option<&EventPayload>) -> String {
    let Some(payload) = payload else {
        return String::new();
    };

    payload
        .entries()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| format!("{}: {}", key, render_value(value)))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => match (number.as_i64(), number.as_u64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(uint)) => uint.to_string(),
            _ => number.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// One derived log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    /// Unique per entry: `<timestamp>-<sequence>`
    pub id: String,
    pub timestamp: f64,
    /// Raw event tag
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<u32>,
    pub message: String,
    pub details: String,
    pub severity: Severity,
}

/// Capped, newest-first event log
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    entries: VecDeque<EventLogEntry>,
    capacity: usize,
    next_seq: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Derive and prepend an entry if the message carries a non-empty event tag.
    ///
    /// Returns the new entry, or `None` when the message has no event.
    pub fn apply_tracker(&mut self, message: &TrackerMessage) -> Option<&EventLogEntry> {
        let tag = message.event_tag()?;
        let payload = message.event_payload.as_ref();

        let id = format!("{}-{}", message.timestamp, self.next_seq);
        self.next_seq += 1;

        let entry = EventLogEntry {
            id,
            timestamp: message.timestamp,
            kind: tag.to_string(),
            person_id: payload.and_then(EventPayload::person_id),
            message: format_event_message(tag),
            details: format_event_details(payload),
            severity: Severity::classify(tag),
        };

        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        self.entries.front()
    }

    /// Drop every entry (explicit user action).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first
    pub fn entries(&self) -> impl Iterator<Item = &EventLogEntry> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&EventLogEntry> {
        self.entries.front()
    }

    pub fn to_vec(&self) -> Vec<EventLogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Serialize for EventLog {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
