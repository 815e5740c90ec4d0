//! HTTP request handlers, grouped by resource.

pub mod clients;
pub mod cortes;
pub mod health;
pub mod invoices;
pub mod products;
pub mod sales;

use chrono::{Datelike, NaiveDate, Utc};

use crate::error::ApiError;
use verde_core::{period, Period};

/// Parses an optional `YYYY-MM-DD` query parameter.
pub(crate) fn parse_opt_date(
    name: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => period::parse_date(raw)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid {name}: expected YYYY-MM-DD"))),
    }
}

/// Resolves `start_date`/`end_date` query parameters into a period,
/// defaulting to the current calendar month when both are absent.
pub(crate) fn resolve_period(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Period, ApiError> {
    match (parse_opt_date("start_date", start)?, parse_opt_date("end_date", end)?) {
        (Some(s), Some(e)) => {
            Period::new(s, e).map_err(|e| ApiError::BadRequest(e.to_string()))
        }
        (Some(s), None) => Ok(Period::single_day(s)),
        (None, Some(_)) => Err(ApiError::BadRequest(
            "end_date requires start_date".to_string(),
        )),
        (None, None) => {
            let today = Utc::now().date_naive();
            Period::for_month(today.year(), today.month())
                .map_err(|e| ApiError::BadRequest(e.to_string()))
        }
    }
}
