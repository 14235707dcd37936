//! Log event record
//!
//! The event is the unit flowing through the whole pipeline: parsed off the
//! wire, queued, and finally written into a daily partition.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A single log event.
///
/// Events are immutable once constructed. In particular the identifier
/// assigned at parse time is kept across every retry of the same logical
/// event, so a requeued event never takes on a new identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Event time. Used solely to select the daily partition.
    pub timestamp: DateTime<Utc>,

    /// Optional free-text message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Remaining key/value data attached to the event.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
}

impl Event {
    /// Create an event from its parts.
    pub fn new(
        id: Uuid,
        timestamp: DateTime<Utc>,
        message: Option<String>,
        fields: HashMap<String, String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            message,
            fields,
        }
    }

    /// Create a plain-message event with a fresh identifier and the current
    /// time. This is the fallback for lines that are not JSON objects.
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message: Some(message.into()),
            fields: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_event_has_no_fields() {
        let event = Event::plain("disk almost full");

        assert_eq!(event.message.as_deref(), Some("disk almost full"));
        assert!(event.fields.is_empty());
    }

    #[test]
    fn test_plain_events_get_distinct_ids() {
        let a = Event::plain("one");
        let b = Event::plain("one");

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_event_serializes_for_logging() {
        let mut fields = HashMap::new();
        fields.insert("host".to_string(), "web-1".to_string());
        let event = Event::new(
            Uuid::nil(),
            DateTime::parse_from_rfc3339("2026-08-07T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            Some("hi".to_string()),
            fields,
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"message\":\"hi\""));
        assert!(json.contains("\"host\":\"web-1\""));
    }
}
