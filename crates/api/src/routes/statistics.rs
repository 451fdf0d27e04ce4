//! Sales statistics endpoints. Administrators only.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use statistics::StatisticsReport;
use store::Store;

use crate::auth::Requester;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Which end of a window a bare date stands for.
#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` taken as UTC, or a bare
/// `YYYY-MM-DD`, which covers the whole day.
fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = raw.parse::<NaiveDateTime>() {
        return Ok(at.and_utc());
    }
    if let Ok(day) = raw.parse::<NaiveDate>() {
        let time = match bound {
            Bound::Start => NaiveTime::MIN,
            Bound::End => NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap_or(NaiveTime::MIN),
        };
        return Ok(day.and_time(time).and_utc());
    }
    Err(ApiError::BadRequest(format!("Invalid date: {raw}")))
}

fn parse_optional(raw: Option<&str>, bound: Bound) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| parse_bound(value, bound))
        .transpose()
}

/// GET /statistics/dashboard - month-to-date revenue with global counts.
#[tracing::instrument(skip(state, requester))]
pub async fn dashboard<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
) -> Result<Json<StatisticsReport>, ApiError> {
    requester.require_admin()?;
    let report = state.statistics.dashboard().await?;
    Ok(Json(report))
}

/// GET /statistics/date-range?start_date=..&end_date=..
#[tracing::instrument(skip(state, requester, params))]
pub async fn date_range<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<StatisticsReport>, ApiError> {
    requester.require_admin()?;
    let start = parse_optional(params.start_date.as_deref(), Bound::Start)?;
    let end = parse_optional(params.end_date.as_deref(), Bound::End)?;

    let report = state.statistics.for_date_range(start, end).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bare_dates_cover_the_whole_day() {
        let start = parse_bound("2024-01-10", Bound::Start).unwrap();
        let end = parse_bound("2024-01-10", Bound::End).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2024, 1, 10, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let at = parse_bound("2024-01-10T09:00:00+02:00", Bound::Start).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 1, 10, 7, 0, 0).unwrap());

        let naive = parse_bound("2024-01-10T09:00:00", Bound::End).unwrap();
        assert_eq!(naive, Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_a_bad_request() {
        assert!(matches!(
            parse_bound("last tuesday", Bound::Start),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(parse_optional(Some("  "), Bound::End).unwrap(), None);
    }
}
