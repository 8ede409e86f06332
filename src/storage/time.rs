use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};

use crate::error::AppError;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for timestamps: UTC, second precision, lexicographically
/// sortable so SQL comparisons on the text columns stay correct.
pub fn to_datetime_string(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub fn to_iso8601_utc_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_datetime_string(s: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| AppError::TimeParse(e.to_string()))?;
    Ok(Utc.from_utc_datetime(&naive))
}

pub fn to_date_string(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub fn parse_date_string(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| AppError::TimeParse(e.to_string()))
}
