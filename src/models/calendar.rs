//! Capacity calendar and date range models.
//!
//! Describes how many hours a user can work on a given calendar day.
//!
//! # Precedence
//! Blocked ranges (time off, holidays) override working weekdays. A day has
//! nominal capacity iff:
//! - Its weekday is one of `working_weekdays`, AND
//! - It does NOT fall within any `blocked` range.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::{TeamId, UserId};

/// An inclusive calendar-day interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days covered (0 when `end < start`).
    pub fn days(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(0)
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Intersection of two ranges, if any.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Self { start, end })
    }

    /// Smallest range covering both.
    pub fn span(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Iterates over each day in the range.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.days()).map(move |offset| start + Duration::days(offset))
    }
}

/// Per-user capacity calendar supplied by the capacity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityCalendar {
    pub user_id: UserId,
    /// Nominal working hours on a working day.
    pub hours_per_day: f64,
    /// Weekdays with nominal capacity.
    #[serde(default = "default_working_weekdays")]
    pub working_weekdays: Vec<Weekday>,
    /// Days without capacity (overrides working weekdays).
    #[serde(default)]
    pub blocked: Vec<DateRange>,
}

fn default_working_weekdays() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

impl CapacityCalendar {
    /// Creates a Monday–Friday calendar.
    pub fn new(user_id: impl Into<UserId>, hours_per_day: f64) -> Self {
        Self {
            user_id: user_id.into(),
            hours_per_day,
            working_weekdays: default_working_weekdays(),
            blocked: Vec::new(),
        }
    }

    /// Adds a blocked range.
    pub fn with_blocked(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.blocked.push(DateRange::new(start, end));
        self
    }

    /// Whether the weekday of `date` is a working weekday.
    pub fn is_working_weekday(&self, date: NaiveDate) -> bool {
        self.working_weekdays.contains(&date.weekday())
    }

    /// Whether `date` falls in a blocked range.
    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.blocked.iter().any(|b| b.contains(date))
    }

    /// Nominal hours available on `date`.
    pub fn hours_on(&self, date: NaiveDate) -> f64 {
        if self.is_blocked(date) || !self.is_working_weekday(date) {
            0.0
        } else {
            self.hours_per_day
        }
    }
}

/// Team membership as known to the capacity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoster {
    pub team_id: TeamId,
    pub members: Vec<UserId>,
}

/// A hypothetical capacity change produced by a `change_capacity` action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityAdjustment {
    pub user_id: UserId,
    /// Relative change, e.g. `-50.0` halves capacity.
    pub delta_percent: f64,
    /// Affected days. `None` = the whole evaluation window.
    pub range: Option<DateRange>,
}

impl CapacityAdjustment {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.range.map_or(true, |r| r.contains(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        // January 2024: the 1st is a Monday.
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_date_range() {
        let r = DateRange::new(date(1), date(5));
        assert_eq!(r.days(), 5);
        assert!(r.contains(date(1)));
        assert!(r.contains(date(5)));
        assert!(!r.contains(date(6)));
        assert_eq!(r.iter_days().count(), 5);
        assert_eq!(DateRange::new(date(5), date(1)).days(), 0);
    }

    #[test]
    fn test_date_range_overlap() {
        let a = DateRange::new(date(1), date(5));
        let b = DateRange::new(date(5), date(9));
        assert!(a.overlaps(&b)); // inclusive: sharing day 5
        assert_eq!(a.intersect(&b), Some(DateRange::new(date(5), date(5))));

        let c = DateRange::new(date(6), date(9));
        assert!(!a.overlaps(&c));
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_weekends_have_no_capacity() {
        let cal = CapacityCalendar::new("u1", 8.0);
        assert!((cal.hours_on(date(5)) - 8.0).abs() < 1e-10); // Friday
        assert!((cal.hours_on(date(6)) - 0.0).abs() < 1e-10); // Saturday
        let week: f64 = DateRange::new(date(1), date(7))
            .iter_days()
            .map(|d| cal.hours_on(d))
            .sum();
        assert!((week - 40.0).abs() < 1e-10);
    }

    #[test]
    fn test_blocked_overrides_working_day() {
        let cal = CapacityCalendar::new("u1", 8.0).with_blocked(date(2), date(3));
        assert!(cal.is_working_weekday(date(2)));
        assert!(cal.is_blocked(date(2)));
        assert!((cal.hours_on(date(2)) - 0.0).abs() < 1e-10);
        let hours: f64 = DateRange::new(date(1), date(5))
            .iter_days()
            .map(|d| cal.hours_on(d))
            .sum();
        assert!((hours - 24.0).abs() < 1e-10);
    }

    #[test]
    fn test_weekend_working_calendar() {
        let mut cal = CapacityCalendar::new("u1", 6.0);
        cal.working_weekdays.push(Weekday::Sun);
        assert!((cal.hours_on(date(7)) - 6.0).abs() < 1e-10); // Sunday
        assert!(cal.hours_on(date(6)).abs() < 1e-10); // Saturday
    }

    #[test]
    fn test_span_covers_both_ranges() {
        let a = DateRange::new(date(1), date(5));
        let b = DateRange::new(date(15), date(19));
        assert_eq!(a.span(&b), DateRange::new(date(1), date(19)));
        assert_eq!(b.span(&a), a.span(&b));
        assert_eq!(a.span(&a), a);
    }

    #[test]
    fn test_adjustment_range() {
        let open = CapacityAdjustment {
            user_id: "u1".into(),
            delta_percent: 10.0,
            range: None,
        };
        assert!(open.applies_on(date(20)));

        let bounded = CapacityAdjustment {
            range: Some(DateRange::new(date(1), date(2))),
            ..open
        };
        assert!(bounded.applies_on(date(2)));
        assert!(!bounded.applies_on(date(3)));
    }
}
