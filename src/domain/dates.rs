use std::error::Error;
use std::fmt;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

const MILLIS_PER_DAY: i128 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDate {
    pub value: String,
}

impl fmt::Display for InvalidDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid date '{}': expected YYYY-MM-DD or an RFC3339 timestamp",
            self.value
        )
    }
}

impl Error for InvalidDate {}

/// Parses a calendar day. RFC3339 timestamps are accepted and reduced to
/// their UTC day.
pub fn parse_day(raw: &str) -> Result<Date, InvalidDate> {
    let trimmed = raw.trim();
    if let Ok(day) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        return Ok(day);
    }
    OffsetDateTime::parse(trimmed, &Rfc3339)
        .map(|ts| ts.to_offset(UtcOffset::UTC).date())
        .map_err(|_| InvalidDate {
            value: raw.to_string(),
        })
}

pub fn format_day(day: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        day.year(),
        u8::from(day.month()),
        day.day()
    )
}

pub fn normalize_day(raw: &str) -> Result<String, InvalidDate> {
    parse_day(raw).map(format_day)
}

/// Midnight UTC of the given day; stored calendar days are read this way.
pub fn day_start(day: Date) -> OffsetDateTime {
    day.midnight().assume_utc()
}

/// Accepts either a calendar day (read as midnight UTC) or an RFC3339 instant.
pub fn parse_instant(raw: &str) -> Result<OffsetDateTime, InvalidDate> {
    let trimmed = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }
    parse_day(trimmed).map(day_start)
}

/// Whole days from `start` to `end`, floored, so an instant one millisecond
/// before `start` counts as day -1.
pub fn days_between(start: OffsetDateTime, end: OffsetDateTime) -> i64 {
    let millis = (end - start).whole_milliseconds();
    millis.div_euclid(MILLIS_PER_DAY) as i64
}

pub fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

pub fn now_utc_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}
