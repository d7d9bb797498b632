use crate::{config::EventTimeFormat, error::ValidationError};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// `strftime` pattern of [`EventTimeFormat::Compact`] timestamps.
pub const COMPACT_EVENT_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Parse an event time, following `format`.
///
/// [`EventTimeFormat::Unchecked`] tries RFC 3339 (any offset) and then the compact form.
pub fn parse_event_time(value: &str, format: EventTimeFormat) -> Option<DateTime<Utc>> {
    match format {
        EventTimeFormat::Rfc3339Utc => DateTime::parse_from_rfc3339(value)
            .ok()
            .filter(|t| t.offset().local_minus_utc() == 0)
            .map(|t| t.with_timezone(&Utc)),
        EventTimeFormat::Compact => parse_compact(value),
        EventTimeFormat::Unchecked => DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_compact(value)),
    }
}

/// Render `time` following `format`.
///
/// [`EventTimeFormat::Unchecked`] renders like [`EventTimeFormat::Rfc3339Utc`].
pub fn format_event_time(time: DateTime<Utc>, format: EventTimeFormat) -> String {
    match format {
        EventTimeFormat::Rfc3339Utc | EventTimeFormat::Unchecked => {
            time.to_rfc3339_opts(SecondsFormat::Millis, true)
        }
        EventTimeFormat::Compact => time.format(COMPACT_EVENT_TIME_FORMAT).to_string(),
    }
}

/// The current instant, rendered following `format`.
pub fn event_time_now(format: EventTimeFormat) -> String {
    format_event_time(Utc::now(), format)
}

pub(crate) fn check_event_time(
    value: &str,
    format: EventTimeFormat,
) -> Result<(), ValidationError> {
    if format == EventTimeFormat::Unchecked || parse_event_time(value, format).is_some() {
        Ok(())
    } else {
        Err(ValidationError::InvalidEventTime {
            value: value.to_owned(),
            format,
        })
    }
}

fn parse_compact(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, COMPACT_EVENT_TIME_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}
