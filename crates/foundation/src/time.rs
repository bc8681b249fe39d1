//! Time primitives
use chrono::{Datelike, NaiveDate};
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // seconds

/// Earliest year the explorer accepts.
pub const MIN_YEAR: i32 = 1900;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("year {year} outside {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },
    #[error("month {0} outside 1..=12")]
    MonthOutOfRange(u32),
    #[error("day {day} outside 1..={max}")]
    DayOutOfRange { day: u32, max: u32 },
}

/// Number of days in `month` (1-based) of `year`. Out-of-range months yield 0.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match next {
        Some(next) => (next - first).num_days() as u32,
        None => 31,
    }
}

/// Calendar month, 1-based. Keys the monthly globe textures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey(u32);

impl MonthKey {
    pub fn new(month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(month))
    }

    pub fn all() -> impl Iterator<Item = MonthKey> {
        (1..=12).map(MonthKey)
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// Zero-based slot, for fixed twelve-entry tables.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Lowercase English month name (`january`..`december`).
    pub fn name(self) -> &'static str {
        MONTH_NAMES[self.index()]
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated calendar date with `MIN_YEAR <= year <= max_year`.
///
/// `max_year` is the current year at construction time; callers pass it in
/// so the type never reads the clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoricalDate {
    year: i32,
    month: u32,
    day: u32,
}

impl HistoricalDate {
    pub fn new(year: i32, month: u32, day: u32, max_year: i32) -> Result<Self, DateError> {
        if year < MIN_YEAR || year > max_year {
            return Err(DateError::YearOutOfRange {
                year,
                min: MIN_YEAR,
                max: max_year,
            });
        }
        if !(1..=12).contains(&month) {
            return Err(DateError::MonthOutOfRange(month));
        }
        let max_day = days_in_month(year, month);
        if day < 1 || day > max_day {
            return Err(DateError::DayOutOfRange { day, max: max_day });
        }
        Ok(Self { year, month, day })
    }

    /// `today`, pulled into the accepted year range.
    pub fn today_clamped(today: NaiveDate) -> Self {
        let year = today.year().max(MIN_YEAR);
        let month = today.month();
        let day = today.day().min(days_in_month(year, month));
        Self { year, month, day }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey(self.month)
    }

    pub fn to_naive(&self) -> NaiveDate {
        // Fields are validated on construction.
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).unwrap_or_default()
    }

    /// Midnight UTC of this date, e.g. `2024-04-29T00:00:00.000Z`.
    pub fn to_iso_midnight_utc(&self) -> String {
        self.to_naive().format("%Y-%m-%dT00:00:00.000Z").to_string()
    }

    /// Short human label, e.g. `Mon, Apr 29, 2024`.
    pub fn display_label(&self) -> String {
        self.to_naive().format("%a, %b %-d, %Y").to_string()
    }
}

impl std::fmt::Display for HistoricalDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}
