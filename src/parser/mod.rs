//! Line-to-event parser
//!
//! Turns one raw network line into one [`Event`]. A line that parses as a
//! JSON object is split into its recognized keys; any other line becomes
//! the event's plain message. Parsing never fails: malformed input
//! degrades to a plain-message event instead of producing an error.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::Event;

/// JSON keys recognized as the event identifier.
const ID_KEYS: [&str; 2] = ["uuid", "id"];

/// JSON key recognized as the event time.
const TIMESTAMP_KEY: &str = "@timestamp";

/// JSON key recognized as the event message.
const MESSAGE_KEY: &str = "message";

/// Parse one line into an event.
///
/// Recognized keys of a JSON object line:
/// - `uuid` / `id`: taken as the identifier when the value is a valid UUID,
///   kept as a plain field otherwise.
/// - `@timestamp`: taken as the event time when the value is RFC 3339,
///   kept as a plain field otherwise.
/// - `message`: the free-text message, verbatim.
///
/// Every other key becomes a string field. A missing identifier is
/// generated, a missing timestamp defaults to now.
pub fn parse_line(line: &str) -> Event {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(object)) => from_json_object(object),
        _ => Event::plain(line),
    }
}

fn from_json_object(object: Map<String, Value>) -> Event {
    let mut id = None;
    let mut timestamp = None;
    let mut message = None;
    let mut fields = HashMap::new();

    for (key, value) in object {
        let text = stringify(&value);

        if ID_KEYS.contains(&key.as_str()) {
            match Uuid::parse_str(&text) {
                Ok(parsed) if id.is_none() => id = Some(parsed),
                // Not RFC 4122, or an identifier was already taken.
                _ => {
                    fields.insert(key, text);
                }
            }
        } else if key == TIMESTAMP_KEY {
            match DateTime::parse_from_rfc3339(&text) {
                Ok(parsed) => timestamp = Some(parsed.with_timezone(&Utc)),
                // Not ISO 8601.
                Err(_) => {
                    fields.insert(key, text);
                }
            }
        } else if key == MESSAGE_KEY {
            message = Some(text);
        } else {
            fields.insert(key, text);
        }
    }

    Event::new(
        id.unwrap_or_else(Uuid::new_v4),
        timestamp.unwrap_or_else(Utc::now),
        message,
        fields,
    )
}

/// Render a JSON value as the string stored in the event.
///
/// Strings are taken verbatim; numbers, booleans and nested values keep
/// their JSON rendering.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_UUID: &str = "3fae2b1a-7c44-4d6e-9f2a-5b8c1d0e4a77";

    #[test]
    fn test_json_object_with_valid_uuid() {
        let line = format!(r#"{{"uuid":"{}","message":"hi","x":"y"}}"#, VALID_UUID);
        let event = parse_line(&line);

        assert_eq!(event.id, Uuid::parse_str(VALID_UUID).unwrap());
        assert_eq!(event.message.as_deref(), Some("hi"));
        assert_eq!(event.fields.len(), 1);
        assert_eq!(event.fields.get("x").map(String::as_str), Some("y"));
    }

    #[test]
    fn test_invalid_uuid_becomes_field() {
        let event = parse_line(r#"{"uuid":"not-a-uuid","message":"hi"}"#);

        assert_eq!(event.message.as_deref(), Some("hi"));
        assert_eq!(
            event.fields.get("uuid").map(String::as_str),
            Some("not-a-uuid")
        );
        // A fresh identifier was generated instead.
        assert_ne!(event.id, Uuid::nil());
    }

    #[test]
    fn test_id_key_is_recognized_too() {
        let line = format!(r#"{{"id":"{}"}}"#, VALID_UUID);
        let event = parse_line(&line);

        assert_eq!(event.id, Uuid::parse_str(VALID_UUID).unwrap());
        assert!(event.fields.is_empty());
    }

    #[test]
    fn test_plain_text_line() {
        let before = Utc::now();
        let event = parse_line("plain text line");
        let after = Utc::now();

        assert_eq!(event.message.as_deref(), Some("plain text line"));
        assert!(event.fields.is_empty());
        assert!(event.timestamp >= before && event.timestamp <= after);
    }

    #[test]
    fn test_valid_timestamp_is_extracted() {
        let event = parse_line(r#"{"@timestamp":"2026-08-07T12:34:56+02:00","message":"m"}"#);

        assert_eq!(
            event.timestamp,
            DateTime::parse_from_rfc3339("2026-08-07T12:34:56+02:00").unwrap()
        );
        assert!(event.fields.is_empty());
    }

    #[test]
    fn test_invalid_timestamp_becomes_field() {
        let event = parse_line(r#"{"@timestamp":"yesterday-ish"}"#);

        assert_eq!(
            event.fields.get("@timestamp").map(String::as_str),
            Some("yesterday-ish")
        );
    }

    #[test]
    fn test_non_string_values_keep_json_rendering() {
        let event = parse_line(r#"{"count":42,"ok":true,"nested":{"a":1}}"#);

        assert_eq!(event.fields.get("count").map(String::as_str), Some("42"));
        assert_eq!(event.fields.get("ok").map(String::as_str), Some("true"));
        assert_eq!(
            event.fields.get("nested").map(String::as_str),
            Some(r#"{"a":1}"#)
        );
        assert!(event.message.is_none());
    }

    #[test]
    fn test_json_array_degrades_to_plain_message() {
        let event = parse_line(r#"[1,2,3]"#);

        assert_eq!(event.message.as_deref(), Some("[1,2,3]"));
        assert!(event.fields.is_empty());
    }

    #[test]
    fn test_empty_object_gets_generated_identity() {
        let event = parse_line("{}");

        assert!(event.message.is_none());
        assert!(event.fields.is_empty());
        assert_ne!(event.id, Uuid::nil());
    }
}
