pub mod activity_repository;
pub mod commission_repository;
pub mod customer_repository;
pub mod rep_repository;
pub mod task_repository;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{AppError, AppResult};

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn format_timestamp_opt(value: Option<&DateTime<Utc>>) -> Option<String> {
    value.map(format_timestamp)
}

pub(crate) fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("stored timestamp '{raw}' is invalid: {err}")))
}

pub(crate) fn parse_timestamp_opt(raw: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    match raw {
        Some(value) if !value.is_empty() => Ok(Some(parse_timestamp(&value)?)),
        _ => Ok(None),
    }
}
