//! Trip request validation
//!
//! Checks a [`TravelRequest`] before any budget or generation work is done and
//! turns it into a [`ValidatedTrip`] with parsed calendar dates and a
//! reconciled trip length.

use std::collections::HashSet;

use chrono::{DateTime, Days, NaiveDate};
use thiserror::Error;
use tracing::warn;

use crate::models::TravelRequest;

/// Upper bound for trip length when no configuration overrides it
pub const DEFAULT_MAX_TRIP_DAYS: u32 = 30;

/// Rejection of a trip request, naming the offending field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("origin and destination must be different places")]
    SameOriginAndDestination,

    #[error("{field} is not a valid date: '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("endDate {end} is before startDate {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("duration must be between 1 and {max} days, got {value}")]
    DurationOutOfRange { value: i64, max: u32 },
}

impl ValidationError {
    /// Request field the error refers to, as named in the JSON payload
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing { field } | ValidationError::InvalidDate { field, .. } => {
                *field
            }
            ValidationError::SameOriginAndDestination => "destination",
            ValidationError::EndBeforeStart { .. } => "endDate",
            ValidationError::DurationOutOfRange { .. } => "duration",
        }
    }
}

/// A trip request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTrip {
    pub origin: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: u32,
    pub budget: String,
    pub travel_style: String,
    pub interests: Vec<String>,
    pub special_requirements: Option<String>,
    /// A supplied duration disagreed with the dates and was replaced
    pub duration_reconciled: bool,
}

/// Validate and normalize a trip request.
///
/// The trip length is the number of days between `startDate` and `endDate`,
/// counting a same-day trip as one day. When both dates and a duration are
/// supplied and disagree, the dates win. Without an end date the duration is
/// required and the end date is derived from it.
pub fn validate_request(
    request: &TravelRequest,
    max_trip_days: u32,
) -> Result<ValidatedTrip, ValidationError> {
    let origin = required("origin", &request.origin)?;
    let destination = required("destination", &request.destination)?;
    if origin.to_lowercase() == destination.to_lowercase() {
        return Err(ValidationError::SameOriginAndDestination);
    }

    let start_date = parse_date("startDate", required("startDate", &request.start_date)?)?;
    let end_date = match request.end_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_date("endDate", raw)?),
        _ => None,
    };

    let (end_date, duration, duration_reconciled) = match (end_date, request.duration) {
        (Some(end), supplied) => {
            if end < start_date {
                return Err(ValidationError::EndBeforeStart {
                    start: start_date,
                    end,
                });
            }
            let span = (end - start_date).num_days().max(1);
            let reconciled = supplied.is_some_and(|d| d != span);
            if reconciled {
                warn!(
                    supplied = ?supplied,
                    span, "duration disagrees with the date span, using the date span"
                );
            }
            (end, span, reconciled)
        }
        (None, Some(days)) => {
            check_duration(days, max_trip_days)?;
            let end = start_date
                .checked_add_days(Days::new(days.unsigned_abs()))
                .ok_or(ValidationError::DurationOutOfRange {
                    value: days,
                    max: max_trip_days,
                })?;
            (end, days, false)
        }
        (None, None) => return Err(ValidationError::Missing { field: "duration" }),
    };
    let duration_days = check_duration(duration, max_trip_days)?;

    Ok(ValidatedTrip {
        origin: origin.to_string(),
        destination: destination.to_string(),
        start_date,
        end_date,
        duration_days,
        budget: request.budget.trim().to_string(),
        travel_style: request.travel_style.trim().to_string(),
        interests: normalize_interests(&request.interests),
        special_requirements: request
            .special_requirements
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        duration_reconciled,
    })
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Missing { field })
    } else {
        Ok(value)
    }
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

fn check_duration(days: i64, max_trip_days: u32) -> Result<u32, ValidationError> {
    u32::try_from(days)
        .ok()
        .filter(|d| (1..=max_trip_days).contains(d))
        .ok_or(ValidationError::DurationOutOfRange {
            value: days,
            max: max_trip_days,
        })
}

/// Trim, drop blanks and remove case-insensitive duplicates, keeping order.
fn normalize_interests(interests: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    interests
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty() && seen.insert(i.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request() -> TravelRequest {
        TravelRequest {
            origin: "Delhi".to_string(),
            destination: "Jaipur".to_string(),
            start_date: "2025-04-05".to_string(),
            end_date: Some("2025-04-08".to_string()),
            duration: Some(3),
            budget: "Moderate (₹10,000 - ₹25,000)".to_string(),
            travel_style: "Cultural".to_string(),
            interests: vec!["History".to_string(), "Food".to_string()],
            special_requirements: None,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_valid_request_is_accepted() {
        let trip = validate_request(&request(), DEFAULT_MAX_TRIP_DAYS).unwrap();
        assert_eq!(trip.start_date, date("2025-04-05"));
        assert_eq!(trip.end_date, date("2025-04-08"));
        assert_eq!(trip.duration_days, 3);
        assert!(!trip.duration_reconciled);
    }

    #[rstest]
    #[case("", "Jaipur", "origin")]
    #[case("Delhi", "   ", "destination")]
    #[case("Delhi", "delhi", "destination")]
    #[case(" JAIPUR ", "jaipur", "destination")]
    fn test_place_rules(#[case] origin: &str, #[case] destination: &str, #[case] field: &str) {
        let mut req = request();
        req.origin = origin.to_string();
        req.destination = destination.to_string();
        let err = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap_err();
        assert_eq!(err.field(), field);
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let mut req = request();
        req.end_date = Some("2025-04-01".to_string());
        let err = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap_err();
        assert_eq!(
            err,
            ValidationError::EndBeforeStart {
                start: date("2025-04-05"),
                end: date("2025-04-01"),
            }
        );
        assert_eq!(err.field(), "endDate");
    }

    #[rstest]
    #[case("05/04/2025")]
    #[case("2025-02-30")]
    #[case("tomorrow")]
    fn test_invalid_start_date(#[case] raw: &str) {
        let mut req = request();
        req.start_date = raw.to_string();
        let err = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDate { field: "startDate", .. }));
    }

    #[test]
    fn test_rfc3339_dates_are_coerced() {
        let mut req = request();
        req.start_date = "2025-04-05T00:00:00.000Z".to_string();
        req.end_date = Some("2025-04-08T00:00:00+05:30".to_string());
        let trip = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap();
        assert_eq!(trip.start_date, date("2025-04-05"));
        assert_eq!(trip.end_date, date("2025-04-08"));
    }

    #[test]
    fn test_conflicting_duration_prefers_dates() {
        let mut req = request();
        req.duration = Some(10);
        let trip = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap();
        assert_eq!(trip.duration_days, 3);
        assert!(trip.duration_reconciled);
    }

    #[test]
    fn test_duration_derived_from_dates_when_missing() {
        let mut req = request();
        req.duration = None;
        let trip = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap();
        assert_eq!(trip.duration_days, 3);
        assert!(!trip.duration_reconciled);
    }

    #[test]
    fn test_same_day_trip_counts_as_one_day() {
        let mut req = request();
        req.end_date = Some("2025-04-05".to_string());
        req.duration = None;
        let trip = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap();
        assert_eq!(trip.duration_days, 1);
    }

    #[test]
    fn test_end_date_derived_from_duration() {
        let mut req = request();
        req.end_date = None;
        req.duration = Some(7);
        let trip = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap();
        assert_eq!(trip.end_date, date("2025-04-12"));
        assert_eq!(trip.duration_days, 7);
    }

    #[test]
    fn test_missing_end_date_and_duration() {
        let mut req = request();
        req.end_date = None;
        req.duration = None;
        let err = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "duration" });
    }

    #[rstest]
    #[case(0)]
    #[case(-2)]
    #[case(31)]
    fn test_duration_out_of_range(#[case] days: i64) {
        let mut req = request();
        req.end_date = None;
        req.duration = Some(days);
        let err = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap_err();
        assert_eq!(err.field(), "duration");
    }

    #[test]
    fn test_date_span_longer_than_max_is_rejected() {
        let mut req = request();
        req.end_date = Some("2025-06-05".to_string());
        let err = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap_err();
        assert!(matches!(err, ValidationError::DurationOutOfRange { value: 61, max: 30 }));
    }

    #[test]
    fn test_max_trip_days_is_configurable() {
        let mut req = request();
        req.end_date = None;
        req.duration = Some(45);
        assert!(validate_request(&req, 60).is_ok());
        assert!(validate_request(&req, 30).is_err());
    }

    #[test]
    fn test_interests_are_normalized() {
        let mut req = request();
        req.interests = vec![
            " History ".to_string(),
            "".to_string(),
            "history".to_string(),
            "Food".to_string(),
        ];
        req.special_requirements = Some("   ".to_string());
        let trip = validate_request(&req, DEFAULT_MAX_TRIP_DAYS).unwrap();
        assert_eq!(trip.interests, vec!["History".to_string(), "Food".to_string()]);
        assert!(trip.special_requirements.is_none());
    }

    #[test]
    fn test_many_repeated_interests_keep_first_spelling() {
        let interests: Vec<String> = (0..500)
            .map(|i| if i % 2 == 0 { "Beaches" } else { "BEACHES" }.to_string())
            .chain(["Forts".to_string()])
            .collect();
        assert_eq!(
            normalize_interests(&interests),
            vec!["Beaches".to_string(), "Forts".to_string()]
        );
    }
}
