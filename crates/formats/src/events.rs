//! Schema for `GET /api/events/by-date` responses.
//!
//! The payload is validated once here; records that cannot be addressed
//! (no `_id`) or that do not match the schema are dropped, so downstream
//! code works with well-typed [`EventRecord`]s only.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const UNTITLED_EVENT: &str = "Untitled Event";

#[derive(Debug, Error)]
pub enum EventsPayloadError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array of events, got {0}")]
    NotAnArray(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(rename = "coreInfo", default)]
    core_info: Option<RawCoreInfo>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoreInfo {
    event_name: Option<String>,
    starting_date: Option<String>,
    end_date: Option<String>,
    #[serde(default)]
    event_tags: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Accepts RFC 3339 timestamps (date taken in UTC) and bare `YYYY-MM-DD`.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc().date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

impl EventRecord {
    fn from_raw(raw: RawEvent) -> Option<Self> {
        let id = non_blank(raw.id)?;
        let core = raw.core_info.unwrap_or_default();
        let name = non_blank(core.event_name)
            .or_else(|| non_blank(raw.title))
            .unwrap_or_else(|| UNTITLED_EVENT.to_string());
        let tags = core
            .event_tags
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect();

        Some(Self {
            id,
            name,
            start_date: core.starting_date.as_deref().and_then(parse_event_date),
            end_date: core.end_date.as_deref().and_then(parse_event_date),
            // Whitespace-only summaries count as missing, unlike a bare null check.
            summary: non_blank(raw.summary),
            tags,
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse the body of an events-by-date response.
///
/// A body that is not a JSON array is rejected; individual malformed
/// records are dropped with a warning.
pub fn parse_events_response(body: &str) -> Result<Vec<EventRecord>, EventsPayloadError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(items) = value else {
        return Err(EventsPayloadError::NotAnArray(kind_of(&value)));
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let raw: RawEvent = match serde_json::from_value(item) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(index, %err, "dropping malformed event record");
                continue;
            }
        };
        match EventRecord::from_raw(raw) {
            Some(record) => out.push(record),
            None => tracing::warn!(index, "dropping event record without _id"),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{EventRecord, EventsPayloadError, parse_event_date, parse_events_response};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_full_record() {
        let body = r#"[{
            "_id": "66a1",
            "coreInfo": {
                "eventName": "Treaty of Versailles",
                "startingDate": "1919-06-28T00:00:00.000Z",
                "endDate": "1919-06-28",
                "eventTags": ["treaty", "ww1"]
            },
            "summary": "Peace treaty signed at the Palace of Versailles."
        }]"#;
        let events = parse_events_response(body).expect("parse");
        assert_eq!(
            events,
            vec![EventRecord {
                id: "66a1".into(),
                name: "Treaty of Versailles".into(),
                start_date: NaiveDate::from_ymd_opt(1919, 6, 28),
                end_date: NaiveDate::from_ymd_opt(1919, 6, 28),
                summary: Some("Peace treaty signed at the Palace of Versailles.".into()),
                tags: vec!["treaty".into(), "ww1".into()],
            }]
        );
    }

    #[test]
    fn name_falls_back_to_title_then_placeholder() {
        let body = r#"[
            {"_id": "a", "title": "Only a title"},
            {"_id": "b", "coreInfo": {"eventName": "  "}}
        ]"#;
        let events = parse_events_response(body).expect("parse");
        assert_eq!(events[0].name, "Only a title");
        assert_eq!(events[1].name, "Untitled Event");
        assert_eq!(events[1].summary, None);
        assert!(events[1].tags.is_empty());
    }

    #[test]
    fn whitespace_summary_counts_as_missing() {
        let body = r#"[
            {"_id": "a", "summary": " \n\t "},
            {"_id": "b", "summary": " Kept as written. "}
        ]"#;
        let events = parse_events_response(body).expect("parse");
        assert_eq!(events[0].summary, None);
        assert_eq!(events[1].summary.as_deref(), Some(" Kept as written. "));
    }

    #[test]
    fn drops_records_without_id_or_with_wrong_shape() {
        let body = r#"[
            {"coreInfo": {"eventName": "No id"}},
            {"_id": 42},
            {"_id": "ok", "coreInfo": {"eventTags": ["x", 3, null]}}
        ]"#;
        let events = parse_events_response(body).expect("parse");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "ok");
        assert_eq!(events[0].tags, vec!["x".to_string()]);
    }

    #[test]
    fn empty_array_is_not_an_error() {
        assert!(parse_events_response("[]").expect("parse").is_empty());
    }

    #[test]
    fn rejects_non_array_bodies() {
        assert!(matches!(
            parse_events_response(r#"{"message":"boom"}"#),
            Err(EventsPayloadError::NotAnArray("object"))
        ));
        assert!(matches!(
            parse_events_response("<html>"),
            Err(EventsPayloadError::Json(_))
        ));
    }

    #[test]
    fn event_dates_tolerate_offsets_and_garbage() {
        assert_eq!(
            parse_event_date("1945-05-08T23:30:00+02:00"),
            NaiveDate::from_ymd_opt(1945, 5, 8)
        );
        assert_eq!(parse_event_date("sometime in May"), None);
    }
}
