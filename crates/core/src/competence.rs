//! Competence cycles: monthly reporting periods that start on a configurable
//! day of the month instead of the 1st.
//!
//! A cycle that starts on day `N` of month `M` and ends the day before day `N`
//! of month `M + 1` is labelled with competence `M + 1`.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompetenceError {
    #[error("Cycle start day must be between 1 and 31, got {0}")]
    InvalidCycleStartDay(u32),
    #[error("Invalid competence: '{0}' (expected YYYY-MM or YYYY-MM-01)")]
    InvalidCompetence(String),
}

/// Day of the month on which a new competence cycle begins (1–31).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CycleStartDay(u8);

impl CycleStartDay {
    pub const DEFAULT: CycleStartDay = CycleStartDay(28);

    pub fn new(day: u32) -> Result<Self, CompetenceError> {
        match day {
            1..=31 => Ok(CycleStartDay(day as u8)),
            other => Err(CompetenceError::InvalidCycleStartDay(other)),
        }
    }

    pub fn day(self) -> u32 {
        u32::from(self.0)
    }

    /// The day the cycle actually starts in the given month. A start day past
    /// the end of a short month is clamped to that month's last day.
    pub fn effective_day(self, year: i32, month: u32) -> u32 {
        self.day().min(days_in_month(year, month))
    }
}

impl Default for CycleStartDay {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for CycleStartDay {
    type Error = CompetenceError;
    fn try_from(day: u32) -> Result<Self, Self::Error> {
        CycleStartDay::new(day)
    }
}

impl From<CycleStartDay> for u32 {
    fn from(day: CycleStartDay) -> u32 {
        day.day()
    }
}

impl fmt::Display for CycleStartDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A financial reporting month, identified by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Competence {
    year: i32,
    month: u32,
}

impl Competence {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Competence { year, month })
    }

    /// Maps a calendar date to the competence whose cycle contains it.
    pub fn for_date(date: NaiveDate, start: CycleStartDay) -> Self {
        let own = Competence {
            year: date.year(),
            month: date.month(),
        };
        if date.day() >= start.effective_day(own.year, own.month) {
            own.next()
        } else {
            own
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Competence { year: self.year + 1, month: 1 }
        } else {
            Competence { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Competence { year: self.year - 1, month: 12 }
        } else {
            Competence { year: self.year, month: self.month - 1 }
        }
    }

    /// `None` only for years outside the calendar range chrono supports.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Inclusive calendar span covered by this competence.
    pub fn date_range(self, start: CycleStartDay) -> Option<DateRange> {
        let prev = self.prev();
        let begin = NaiveDate::from_ymd_opt(
            prev.year,
            prev.month,
            start.effective_day(prev.year, prev.month),
        )?;
        let next_begin = NaiveDate::from_ymd_opt(
            self.year,
            self.month,
            start.effective_day(self.year, self.month),
        )?;
        Some(DateRange::new(begin, next_begin - Duration::days(1)))
    }
}

impl fmt::Display for Competence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-01", self.year, self.month)
    }
}

impl FromStr for Competence {
    type Err = CompetenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CompetenceError::InvalidCompetence(s.to_string());
        let mut parts = s.trim().split('-');
        let year = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        let month = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        match (parts.next(), parts.next()) {
            (None, None) | (Some("01"), None) => Competence::new(year, month).ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Competence {
    type Error = CompetenceError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Competence> for String {
    fn from(c: Competence) -> String {
        c.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Tags every transaction with its competence. Transactions without a date
/// get no competence and stay out of competence-keyed aggregation.
pub fn assign_competences(transactions: &mut [Transaction], start: CycleStartDay) {
    let mut undated = 0usize;
    for tx in transactions.iter_mut() {
        tx.competence = tx.date.map(|d| Competence::for_date(d, start));
        if tx.competence.is_none() {
            undated += 1;
        }
    }
    tracing::debug!(
        total = transactions.len(),
        undated,
        cycle_start_day = start.day(),
        "Assigned competences"
    );
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn comp(y: i32, m: u32) -> Competence {
        Competence::new(y, m).unwrap()
    }

    fn day(n: u32) -> CycleStartDay {
        CycleStartDay::new(n).unwrap()
    }

    #[test]
    fn cycle_start_day_bounds() {
        assert!(CycleStartDay::new(0).is_err());
        assert!(CycleStartDay::new(1).is_ok());
        assert!(CycleStartDay::new(31).is_ok());
        assert_eq!(
            CycleStartDay::new(32),
            Err(CompetenceError::InvalidCycleStartDay(32))
        );
        assert_eq!(CycleStartDay::default().day(), 28);
    }

    #[test]
    fn boundaries_for_day_28() {
        let start = day(28);
        assert_eq!(Competence::for_date(date(2025, 11, 27), start), comp(2025, 11));
        assert_eq!(Competence::for_date(date(2025, 11, 28), start), comp(2025, 12));
        assert_eq!(Competence::for_date(date(2025, 12, 27), start), comp(2025, 12));
        assert_eq!(Competence::for_date(date(2025, 12, 28), start), comp(2026, 1));
    }

    #[test]
    fn end_of_month_stays_in_next_cycle() {
        let start = day(28);
        assert_eq!(Competence::for_date(date(2025, 11, 30), start), comp(2025, 12));
        assert_eq!(Competence::for_date(date(2025, 12, 31), start), comp(2026, 1));
    }

    #[test]
    fn start_day_past_month_end_is_clamped() {
        let start = day(31);
        // April has 30 days: the cycle starts on the 30th.
        assert_eq!(Competence::for_date(date(2025, 4, 29), start), comp(2025, 4));
        assert_eq!(Competence::for_date(date(2025, 4, 30), start), comp(2025, 5));
        // February in a leap year.
        assert_eq!(Competence::for_date(date(2024, 2, 28), start), comp(2024, 2));
        assert_eq!(Competence::for_date(date(2024, 2, 29), start), comp(2024, 3));
        // February in a common year.
        assert_eq!(Competence::for_date(date(2025, 2, 28), start), comp(2025, 3));
    }

    #[test]
    fn start_day_one_labels_every_date_with_next_month() {
        let start = day(1);
        assert_eq!(Competence::for_date(date(2025, 3, 1), start), comp(2025, 4));
        assert_eq!(Competence::for_date(date(2025, 3, 31), start), comp(2025, 4));
    }

    #[test]
    fn next_and_prev_cross_year() {
        assert_eq!(comp(2025, 12).next(), comp(2026, 1));
        assert_eq!(comp(2026, 1).prev(), comp(2025, 12));
    }

    #[test]
    fn new_rejects_invalid_month() {
        assert!(Competence::new(2025, 0).is_none());
        assert!(Competence::new(2025, 13).is_none());
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(comp(2025, 12).to_string(), "2025-12-01");
        assert_eq!("2025-12".parse::<Competence>().unwrap(), comp(2025, 12));
        assert_eq!("2025-12-01".parse::<Competence>().unwrap(), comp(2025, 12));
        assert!("2025-12-15".parse::<Competence>().is_err());
        assert!("december".parse::<Competence>().is_err());
    }

    #[test]
    fn serializes_as_first_day() {
        let json = serde_json::to_string(&comp(2026, 1)).unwrap();
        assert_eq!(json, "\"2026-01-01\"");
        let back: Competence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, comp(2026, 1));
    }

    #[test]
    fn ordering_is_chronological() {
        assert!(comp(2025, 12) < comp(2026, 1));
        assert!(comp(2025, 2) < comp(2025, 11));
    }

    #[test]
    fn date_range_spans_one_cycle() {
        let range = comp(2025, 12).date_range(day(28)).unwrap();
        assert_eq!(range.start, date(2025, 11, 28));
        assert_eq!(range.end, date(2025, 12, 27));
        assert_eq!(range.days(), 30);
        assert_eq!(range.to_string(), "2025-11-28 to 2025-12-27");
    }

    #[test]
    fn date_range_agrees_with_for_date() {
        let start = day(31);
        let c = comp(2025, 3);
        let range = c.date_range(start).unwrap();
        // Starts on the clamped last day of February.
        assert_eq!(range.start, date(2025, 2, 28));
        assert_eq!(range.end, date(2025, 3, 30));
        let mut d = range.start;
        while d <= range.end {
            assert_eq!(Competence::for_date(d, start), c, "date {d}");
            d += Duration::days(1);
        }
        assert_ne!(Competence::for_date(range.end + Duration::days(1), start), c);
    }

    #[test]
    fn date_range_contains_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31));
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 12, 31)));
        assert!(!range.contains(date(2023, 12, 31)));
        assert!(!range.contains(date(2025, 1, 1)));
    }
}
