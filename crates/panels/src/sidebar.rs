//! Events for the selected (country, date), as the sidebar shows them.
//!
//! One query is issued per change of the pair. Responses carry the
//! [`RequestId`] they were issued with; only the latest is applied.

use formats::events::{EventRecord, EventsPayloadError, parse_events_response};
use foundation::time::HistoricalDate;
use runtime::config::ExplorerConfig;
use serde::Serialize;
use streaming::request::{RequestId, RequestSequencer};
use thiserror::Error;

pub const NO_SUMMARY: &str = "No summary available.";
pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_EVENTS_TITLE: &str = "No Events Found";

#[derive(Debug, Error)]
pub enum EventQueryError {
    #[error("Failed to fetch events")]
    Http { status: u16 },
    #[error("{0}")]
    Network(String),
    #[error(transparent)]
    Payload(#[from] EventsPayloadError),
}

/// One card in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub name: String,
    /// `dd/mm/yyyy` or `N/A`.
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    /// At most the visible tag limit.
    pub tags: Vec<String>,
    /// How many tags the `+N more` badge stands for.
    pub hidden_tags: usize,
    /// Detail route for this event.
    pub path: String,
}

impl EventSummary {
    pub fn from_record(record: &EventRecord, summary_max_chars: usize, tag_limit: usize) -> Self {
        let fmt_date = |d: Option<chrono::NaiveDate>| {
            d.map_or_else(|| NOT_AVAILABLE.to_string(), |d| d.format("%d/%m/%Y").to_string())
        };
        let visible = record.tags.len().min(tag_limit);
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            start_date: fmt_date(record.start_date),
            end_date: fmt_date(record.end_date),
            description: truncate_summary(record.summary.as_deref(), summary_max_chars),
            tags: record.tags[..visible].to_vec(),
            hidden_tags: record.tags.len() - visible,
            path: event_path(&record.id),
        }
    }

    /// Badge text for the tags that did not fit, e.g. `+2 more`.
    pub fn more_tags_label(&self) -> Option<String> {
        (self.hidden_tags > 0).then(|| format!("+{} more", self.hidden_tags))
    }
}

fn truncate_summary(summary: Option<&str>, max_chars: usize) -> String {
    match summary {
        None | Some("") => NO_SUMMARY.to_string(),
        Some(s) => match s.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &s[..cut]),
            None => s.to_string(),
        },
    }
}

/// Same character set as JavaScript's `encodeURIComponent`.
pub fn encode_uri_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

pub fn event_path(id: &str) -> String {
    format!("/event/{}", encode_uri_component(id))
}

/// A query the host should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub country: String,
    pub date: HistoricalDate,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SidebarView {
    /// No country selected yet.
    Idle,
    Loading,
    Loaded { events: Vec<EventSummary> },
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarHeader {
    pub country: String,
    /// e.g. `4/29/2024`
    pub date_label: String,
}

#[derive(Debug)]
pub struct EventSidebar {
    endpoint: String,
    summary_max_chars: usize,
    tag_limit: usize,
    sequencer: RequestSequencer,
    current: Option<(String, HistoricalDate)>,
    view: SidebarView,
}

impl EventSidebar {
    pub fn new(config: &ExplorerConfig) -> Self {
        Self {
            endpoint: config.events_by_date_url(),
            summary_max_chars: config.summary_max_chars,
            tag_limit: config.visible_tag_limit,
            sequencer: RequestSequencer::new(),
            current: None,
            view: SidebarView::Idle,
        }
    }

    /// Called whenever the selected country or the date may have changed.
    ///
    /// Returns a query only when both are present and the pair differs from
    /// the one last queried. No debounce: every change issues a request.
    pub fn request_for(
        &mut self,
        country: Option<&str>,
        date: Option<HistoricalDate>,
    ) -> Option<(RequestId, EventQuery)> {
        let (Some(country), Some(date)) = (country, date) else {
            return None;
        };
        if let Some((c, d)) = &self.current {
            if c == country && *d == date {
                return None;
            }
        }

        let id = self.sequencer.issue();
        let url = format!(
            "{}?country={}&date={}",
            self.endpoint,
            encode_uri_component(country),
            encode_uri_component(&date.to_iso_midnight_utc())
        );
        self.current = Some((country.to_string(), date));
        self.view = SidebarView::Loading;
        tracing::debug!(request = id.0, %country, %date, "event query issued");
        Some((
            id,
            EventQuery {
                country: country.to_string(),
                date,
                url,
            },
        ))
    }

    /// Apply a completed query. Returns `false` if it was stale and dropped.
    pub fn on_response(&mut self, id: RequestId, result: Result<String, EventQueryError>) -> bool {
        if !self.sequencer.is_latest(id) {
            tracing::debug!(request = id.0, latest = ?self.sequencer.latest(), "dropping stale event response");
            return false;
        }

        let parsed = result.and_then(|body| parse_events_response(&body).map_err(EventQueryError::from));
        self.view = match parsed {
            Ok(records) if records.is_empty() => SidebarView::Empty,
            Ok(records) => SidebarView::Loaded {
                events: records
                    .iter()
                    .map(|r| EventSummary::from_record(r, self.summary_max_chars, self.tag_limit))
                    .collect(),
            },
            Err(err) => {
                tracing::warn!(request = id.0, %err, "event query failed");
                SidebarView::Failed {
                    message: err.to_string(),
                }
            }
        };
        true
    }

    pub fn view(&self) -> &SidebarView {
        &self.view
    }

    pub fn header(&self) -> Option<SidebarHeader> {
        self.current.as_ref().map(|(country, date)| SidebarHeader {
            country: country.clone(),
            date_label: date.to_naive().format("%-m/%-d/%Y").to_string(),
        })
    }

    pub fn latest_request(&self) -> Option<RequestId> {
        self.sequencer.latest()
    }

    /// Drop everything in flight (scene unmount).
    pub fn reset(&mut self) {
        self.sequencer.invalidate();
        self.current = None;
        self.view = SidebarView::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> HistoricalDate {
        HistoricalDate::new(y, m, d, 2026).expect("date")
    }

    fn sidebar() -> EventSidebar {
        EventSidebar::new(&ExplorerConfig::default())
    }

    fn record(summary: Option<&str>, tags: &[&str]) -> EventRecord {
        EventRecord {
            id: "65f0c0ffee".into(),
            name: "Treaty".into(),
            start_date: NaiveDate::from_ymd_opt(1919, 6, 28),
            end_date: None,
            summary: summary.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn summary_formatting() {
        let s = EventSummary::from_record(&record(None, &["a", "b", "c", "d", "e", "f"]), 150, 4);
        assert_eq!(s.start_date, "28/06/1919");
        assert_eq!(s.end_date, "N/A");
        assert_eq!(s.description, NO_SUMMARY);
        assert_eq!(s.tags, vec!["a", "b", "c", "d"]);
        assert_eq!(s.more_tags_label().as_deref(), Some("+2 more"));
        assert_eq!(s.path, "/event/65f0c0ffee");

        let few = EventSummary::from_record(&record(Some("short"), &["a"]), 150, 4);
        assert_eq!(few.description, "short");
        assert_eq!(few.more_tags_label(), None);
    }

    #[test]
    fn long_summaries_are_cut_on_char_boundaries() {
        let long = "é".repeat(151);
        let s = EventSummary::from_record(&record(Some(&long), &[]), 150, 4);
        assert_eq!(s.description.chars().count(), 153);
        assert!(s.description.ends_with("é..."));

        let exact = "x".repeat(150);
        let s = EventSummary::from_record(&record(Some(&exact), &[]), 150, 4);
        assert_eq!(s.description, exact);
    }

    #[test]
    fn uri_component_encoding() {
        assert_eq!(encode_uri_component("Côte d'Ivoire"), "C%C3%B4te%20d'Ivoire");
        assert_eq!(
            encode_uri_component("2024-04-29T00:00:00.000Z"),
            "2024-04-29T00%3A00%3A00.000Z"
        );
        assert_eq!(event_path("a/b"), "/event/a%2Fb");
    }

    #[test]
    fn query_needs_both_inputs() {
        let mut sb = sidebar();
        assert!(sb.request_for(None, Some(date(2024, 4, 29))).is_none());
        assert!(sb.request_for(Some("Peru"), None).is_none());
        assert_eq!(sb.view(), &SidebarView::Idle);
    }

    #[test]
    fn query_url_and_dedup() {
        let mut sb = sidebar();
        let (id, q) = sb
            .request_for(Some("South Africa"), Some(date(2024, 4, 29)))
            .expect("query");
        assert_eq!(
            q.url,
            "/api/events/by-date?country=South%20Africa&date=2024-04-29T00%3A00%3A00.000Z"
        );
        assert_eq!(sb.view(), &SidebarView::Loading);
        assert!(sb.request_for(Some("South Africa"), Some(date(2024, 4, 29))).is_none());
        assert_eq!(sb.latest_request(), Some(id));

        let (id2, _) = sb
            .request_for(Some("South Africa"), Some(date(2024, 4, 30)))
            .expect("new date");
        assert!(id2 > id);
        let header = sb.header().expect("header");
        assert_eq!(header.date_label, "4/30/2024");
    }

    #[test]
    fn zero_results_is_the_empty_state() {
        let mut sb = sidebar();
        let (id, _) = sb.request_for(Some("Peru"), Some(date(1900, 1, 1))).expect("query");
        assert!(sb.on_response(id, Ok("[]".into())));
        assert_eq!(sb.view(), &SidebarView::Empty);
    }

    #[test]
    fn results_are_summarised_in_order() {
        let mut sb = sidebar();
        let (id, _) = sb.request_for(Some("France"), Some(date(1919, 6, 28))).expect("query");
        let body = r#"[
            {"_id": "1", "coreInfo": {"eventName": "Versailles", "startingDate": "1919-06-28T00:00:00.000Z"}},
            {"_id": "2", "title": "Fallback title"}
        ]"#;
        assert!(sb.on_response(id, Ok(body.into())));
        let SidebarView::Loaded { events } = sb.view() else {
            panic!("expected loaded view, got {:?}", sb.view());
        };
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Versailles", "Fallback title"]);
        assert_eq!(events[0].start_date, "28/06/1919");
    }

    #[test]
    fn failures_render_inline() {
        let mut sb = sidebar();
        let (id, _) = sb.request_for(Some("Chad"), Some(date(2000, 1, 1))).expect("query");
        sb.on_response(id, Err(EventQueryError::Http { status: 500 }));
        assert_eq!(
            sb.view(),
            &SidebarView::Failed {
                message: "Failed to fetch events".into()
            }
        );

        let (id, _) = sb.request_for(Some("Chad"), Some(date(2000, 1, 2))).expect("query");
        sb.on_response(id, Ok(r#"{"error": "nope"}"#.into()));
        assert!(matches!(sb.view(), SidebarView::Failed { .. }));
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut sb = sidebar();
        let (first, _) = sb.request_for(Some("Chile"), Some(date(2010, 2, 27))).expect("q1");
        let (second, _) = sb.request_for(Some("Japan"), Some(date(2011, 3, 11))).expect("q2");

        assert!(sb.on_response(second, Ok("[]".into())));
        assert!(!sb.on_response(first, Ok(r#"[{"_id": "x"}]"#.into())));
        assert_eq!(sb.view(), &SidebarView::Empty);
        assert_eq!(sb.header().map(|h| h.country).as_deref(), Some("Japan"));
    }

    #[test]
    fn reset_discards_in_flight() {
        let mut sb = sidebar();
        let (id, _) = sb.request_for(Some("Chile"), Some(date(2010, 2, 27))).expect("q");
        sb.reset();
        assert!(!sb.on_response(id, Ok("[]".into())));
        assert_eq!(sb.view(), &SidebarView::Idle);
        // The same pair can be queried again after a reset.
        assert!(sb.request_for(Some("Chile"), Some(date(2010, 2, 27))).is_some());
    }

    #[test]
    fn view_serializes_with_state_tag() {
        let json = serde_json::to_value(SidebarView::Failed {
            message: "boom".into(),
        })
        .expect("json");
        assert_eq!(json["state"], "failed");
        assert_eq!(json["message"], "boom");
    }
}
