//! Field-change events extracted from an issue's change history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::timestamp::parse_timestamp;

/// Issue fields whose transitions shape the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Status,
    Assignee,
}

impl TrackedField {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Assignee => "assignee",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedField {
    type Err = UntrackedField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("status") {
            Ok(Self::Status)
        } else if s.eq_ignore_ascii_case("assignee") {
            Ok(Self::Assignee)
        } else {
            Err(UntrackedField(s.to_string()))
        }
    }
}

/// A history item for a field the timeline ignores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("untracked field: {0}")]
pub struct UntrackedField(String);

/// One status or assignee transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// When the change was recorded.
    pub timestamp: DateTime<Utc>,
    pub field: TrackedField,
    /// Display name of the new value, if the history carried one.
    pub value: Option<String>,
    /// Display name of the value being replaced.
    pub previous: Option<String>,
}

impl ChangeEvent {
    pub fn new(timestamp: DateTime<Utc>, field: TrackedField, value: Option<&str>) -> Self {
        Self {
            timestamp,
            field,
            value: value.map(String::from),
            previous: None,
        }
    }

    /// Sets the replaced value.
    #[must_use]
    pub fn with_previous(mut self, previous: &str) -> Self {
        self.previous = Some(previous.to_string());
        self
    }
}

/// One entry of the tracker's change history, as delivered on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: Option<String>,
    /// Raw timestamp, usually with a colon-less offset.
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

/// A single field change inside a [`HistoryRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub from: Option<Value>,
    #[serde(default, rename = "fromString")]
    pub from_display: Option<String>,
    #[serde(default)]
    pub to: Option<Value>,
    #[serde(default, rename = "toString")]
    pub to_display: Option<String>,
}

impl HistoryItem {
    /// New value: display string first, raw value as a fallback.
    fn new_value(&self) -> Option<&str> {
        non_empty(self.to_display.as_deref()).or_else(|| value_text(self.to.as_ref()))
    }

    fn old_value(&self) -> Option<&str> {
        non_empty(self.from_display.as_deref()).or_else(|| value_text(self.from.as_ref()))
    }

    fn tracked_field(&self) -> Option<TrackedField> {
        self.field.as_deref().and_then(|f| f.parse().ok())
    }
}

/// Flattens raw history records into status and assignee events.
///
/// Records whose `created` timestamp cannot be parsed are skipped. The
/// result keeps feed order; the timeline sorts it.
pub fn extract_events(histories: &[HistoryRecord]) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    for record in histories {
        let Some(at) = record.created.as_deref().and_then(parse_timestamp) else {
            tracing::debug!(
                id = record.id.as_deref().unwrap_or("-"),
                created = record.created.as_deref().unwrap_or(""),
                "skipping history record with unparsable timestamp"
            );
            continue;
        };
        for item in &record.items {
            let Some(field) = item.tracked_field() else {
                continue;
            };
            events.push(ChangeEvent {
                timestamp: at,
                field,
                value: item.new_value().map(String::from),
                previous: item.old_value().map(String::from),
            });
        }
    }
    events
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn value_text(value: Option<&Value>) -> Option<&str> {
    non_empty(value.and_then(Value::as_str))
}
