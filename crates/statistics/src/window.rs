//! Time windows statistics are computed over.

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc};
use serde::Serialize;
use store::OrderFilter;

use crate::error::{Result, StatisticsError};

/// An inclusive UTC time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatisticsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StatisticsWindow {
    /// Creates a window, rejecting a start after the end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(StatisticsError::Validation(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Creates a window from optional bounds; both must be present.
    pub fn from_bounds(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            (None, _) => Err(StatisticsError::Validation("start date is required".into())),
            (_, None) => Err(StatisticsError::Validation("end date is required".into())),
        }
    }

    /// From midnight on the first day of `now`'s month up to `now`.
    pub fn month_to_date(now: DateTime<Utc>) -> Self {
        let first_day = now.date_naive() - Days::new(u64::from(now.day0()));
        Self {
            start: first_day.and_time(NaiveTime::MIN).and_utc(),
            end: now,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Order filter selecting orders created inside the window.
    pub fn filter(&self) -> OrderFilter {
        OrderFilter::new().created_between(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn month_to_date_starts_at_first_midnight() {
        let window = StatisticsWindow::month_to_date(at(2024, 3, 17, 15));
        assert_eq!(window.start, at(2024, 3, 1, 0));
        assert_eq!(window.end, at(2024, 3, 17, 15));

        let window = StatisticsWindow::month_to_date(at(2024, 3, 1, 0));
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn bounds_are_inclusive() {
        let window = StatisticsWindow::new(at(2024, 1, 1, 0), at(2024, 1, 2, 0)).unwrap();
        assert!(window.contains(at(2024, 1, 1, 0)));
        assert!(window.contains(at(2024, 1, 2, 0)));
        assert!(!window.contains(at(2024, 1, 2, 1)));
    }

    #[test]
    fn inverted_or_missing_bounds_are_rejected() {
        assert!(matches!(
            StatisticsWindow::new(at(2024, 2, 1, 0), at(2024, 1, 1, 0)),
            Err(StatisticsError::Validation(_))
        ));
        assert!(StatisticsWindow::from_bounds(None, Some(at(2024, 1, 1, 0))).is_err());
        assert!(StatisticsWindow::from_bounds(Some(at(2024, 1, 1, 0)), None).is_err());
        assert!(
            StatisticsWindow::from_bounds(Some(at(2024, 1, 1, 0)), Some(at(2024, 1, 1, 0)))
                .is_ok()
        );
    }
}
