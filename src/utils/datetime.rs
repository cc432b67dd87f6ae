use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::BotError;

/// Schedule format accepted from operators, e.g. `24.12.2024 18:30`.
pub const SCHEDULE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Parses an operator-supplied schedule string as UTC.
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>, BotError> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), SCHEDULE_FORMAT)
        .map_err(|_| BotError::Format(format!("cannot parse schedule: {input}")))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Fixed-width RFC3339 so that lexicographic order in sqlite matches
/// chronological order.
pub fn to_storage(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn from_storage(raw: &str) -> Result<DateTime<Utc>, BotError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| BotError::Invariant(format!("bad stored timestamp: {raw}")))
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(SCHEDULE_FORMAT).to_string()
}
