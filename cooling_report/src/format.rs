//! Display formatting for report text.
//!
//! Every number shown to the reader goes through [`decimal`], which always
//! uses a comma as decimal separator. Computation never sees these strings.

use chrono::{Duration, NaiveDateTime, Timelike};

/// Format `value` with `places` decimals and a comma separator.
pub fn decimal(value: f64, places: usize) -> String {
    let text = format!("{:.*}", places, value).replace('.', ",");
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == ',') => rest.to_string(),
        _ => text,
    }
}

/// `HH:MM` of the instant `minutes` after `start`, for chart axis labels.
pub fn clock_label(start: NaiveDateTime, minutes: f64) -> String {
    let offset = Duration::seconds((minutes * 60.0).round() as i64);
    (start + offset).format("%H:%M").to_string()
}

pub fn timestamp(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M:%S").to_string()
}

pub fn clock_with_seconds(at: NaiveDateTime) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Replace the seconds field, suggesting a mid-minute sampling instant.
pub fn pin_second(at: NaiveDateTime, second: u32) -> NaiveDateTime {
    at.with_second(second).unwrap_or(at)
}
