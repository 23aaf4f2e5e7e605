//! Epoch timestamp normalisation.

use chrono::{DateTime, Utc};

use crate::context::EventTime;

/// Largest integer-digit count still read as whole seconds.
const SECONDS_DIGITS: usize = 12;
/// Integer-digit count of a millisecond epoch value.
const MILLIS_DIGITS: usize = 13;

fn integer_digits(value: f64) -> usize {
    format!("{:.0}", value.abs().trunc()).len()
}

/// Normalise a raw epoch number to seconds.
///
/// Up to twelve integer digits are seconds and thirteen are milliseconds.
/// Longer values keep their leading thirteen digits as milliseconds.
fn epoch_seconds(raw: f64) -> f64 {
    match integer_digits(raw) {
        d if d <= SECONDS_DIGITS => raw,
        MILLIS_DIGITS => raw / 1000.0,
        d => {
            let excess = i32::try_from(d - MILLIS_DIGITS).unwrap_or(i32::MAX);
            (raw / 10f64.powi(excess)).trunc() / 1000.0
        }
    }
}

fn format_millis(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    format!("{sign}{}.{:03}", abs / 1000, abs % 1000)
}

/// Render the envelope `time` field: epoch seconds with three decimals.
///
/// `now` stands in when the event carries no timestamp or a non-finite one.
pub fn format_time(time: Option<EventTime>, now: DateTime<Utc>) -> String {
    match time {
        Some(EventTime::At(at)) => format_millis(at.timestamp_millis()),
        Some(EventTime::Epoch(raw)) if raw.is_finite() => format!("{:.3}", epoch_seconds(raw)),
        Some(EventTime::Epoch(_)) | None => format_millis(now.timestamp_millis()),
    }
}
