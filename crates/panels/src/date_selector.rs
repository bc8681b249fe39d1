//! Day / month / year entry with clamp-on-commit.
//!
//! Each field keeps the raw text being typed and is only validated when it
//! loses focus. A commit produces a new [`HistoricalDate`] only when the
//! composite date differs from the last one handed out.

use chrono::{Datelike, NaiveDate};
use foundation::time::{HistoricalDate, MIN_YEAR, days_in_month};
use runtime::config::ExplorerConfig;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DateField {
    Day,
    Month,
    Year,
}

impl DateField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "day" => Some(DateField::Day),
            "month" => Some(DateField::Month),
            "year" => Some(DateField::Year),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Warning {
    message: String,
    expires_at_ms: f64,
}

/// What the host renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSelectorView {
    pub day: String,
    pub month: String,
    pub year: String,
    /// e.g. `Mon, Apr 29, 2024`
    pub label: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DateSelector {
    min_year: i32,
    max_year: i32,
    warning_duration_ms: f64,

    day_text: String,
    month_text: String,
    year_text: String,

    committed: HistoricalDate,
    last_emitted: HistoricalDate,
    warning: Option<Warning>,
}

/// `parseInt`-style: optional leading whitespace and sign, then digits;
/// trailing garbage is ignored. `None` when no digit leads.
fn parse_leading_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = &digits[..digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len())];
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

impl DateSelector {
    /// Fields start at `today`; the latest selectable year is today's.
    pub fn new(today: NaiveDate, config: &ExplorerConfig) -> Self {
        let min_year = config.min_year.max(MIN_YEAR);
        let max_year = today.year().max(min_year);
        let today = HistoricalDate::today_clamped(today);
        let year = today.year().clamp(min_year, max_year);
        let day = today.day().min(days_in_month(year, today.month()));
        let committed = HistoricalDate::new(year, today.month(), day, max_year).unwrap_or(today);

        let mut selector = Self {
            min_year,
            max_year,
            warning_duration_ms: config.warning_duration_ms,
            day_text: String::new(),
            month_text: String::new(),
            year_text: String::new(),
            committed,
            last_emitted: committed,
            warning: None,
        };
        selector.sync_texts();
        selector
    }

    pub fn min_year(&self) -> i32 {
        self.min_year
    }

    pub fn max_year(&self) -> i32 {
        self.max_year
    }

    /// Keystroke: store the raw text, no validation.
    pub fn input(&mut self, field: DateField, text: &str) {
        let slot = match field {
            DateField::Day => &mut self.day_text,
            DateField::Month => &mut self.month_text,
            DateField::Year => &mut self.year_text,
        };
        slot.clear();
        slot.push_str(text);
    }

    /// Blur: validate `field`, re-clamp the day against the committed
    /// year/month, and return the new date if it changed.
    pub fn commit(&mut self, field: DateField, now_ms: f64) -> Option<HistoricalDate> {
        let (mut year, mut month, mut day) = (
            self.committed.year(),
            self.committed.month(),
            self.committed.day(),
        );

        match field {
            DateField::Year => {
                year = match parse_leading_int(&self.year_text) {
                    Some(y) if y > i64::from(self.max_year) => {
                        self.warn(
                            format!("Year cannot be in the future. Setting to {}.", self.max_year),
                            now_ms,
                        );
                        self.max_year
                    }
                    Some(y) if y >= i64::from(self.min_year) => y as i32,
                    _ => {
                        self.warn(
                            format!(
                                "Year must be after {min}. Setting to {min}.",
                                min = self.min_year
                            ),
                            now_ms,
                        );
                        self.min_year
                    }
                };
            }
            DateField::Month => {
                month = parse_leading_int(&self.month_text).map_or(1, |m| m.clamp(1, 12) as u32);
            }
            DateField::Day => {
                day = parse_leading_int(&self.day_text)
                    .map_or(1, |d| d.clamp(1, 31) as u32);
            }
        }
        day = day.clamp(1, days_in_month(year, month));

        let next = match HistoricalDate::new(year, month, day, self.max_year) {
            Ok(date) => date,
            Err(err) => {
                tracing::warn!(%err, "date commit rejected");
                self.sync_texts();
                return None;
            }
        };
        self.committed = next;
        self.sync_texts();

        if next == self.last_emitted {
            return None;
        }
        self.last_emitted = next;
        tracing::debug!(date = %next, "date committed");
        Some(next)
    }

    /// Expire the warning once its time is up. Returns `true` if it was
    /// dismissed by this call.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        match &self.warning {
            Some(w) if now_ms >= w.expires_at_ms => {
                self.warning = None;
                true
            }
            _ => false,
        }
    }

    fn warn(&mut self, message: String, now_ms: f64) {
        tracing::debug!(%message, "date clamped");
        self.warning = Some(Warning {
            message,
            expires_at_ms: now_ms + self.warning_duration_ms,
        });
    }

    fn sync_texts(&mut self) {
        self.day_text = self.committed.day().to_string();
        self.month_text = self.committed.month().to_string();
        self.year_text = self.committed.year().to_string();
    }

    pub fn text(&self, field: DateField) -> &str {
        match field {
            DateField::Day => &self.day_text,
            DateField::Month => &self.month_text,
            DateField::Year => &self.year_text,
        }
    }

    pub fn committed(&self) -> HistoricalDate {
        self.committed
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_ref().map(|w| w.message.as_str())
    }

    pub fn label(&self) -> String {
        self.committed.display_label()
    }

    pub fn view(&self) -> DateSelectorView {
        DateSelectorView {
            day: self.day_text.clone(),
            month: self.month_text.clone(),
            year: self.year_text.clone(),
            label: self.label(),
            warning: self.warning().map(str::to_string),
        }
    }
}
