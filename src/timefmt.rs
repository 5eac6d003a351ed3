//! Duration and timestamp formatting
//!
//! Timestamps are the provider's airport-local wall-clock times. They are
//! never converted between zones: elapsed time is plain wall-clock
//! subtraction.

use chrono::{DateTime, NaiveDateTime};

const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Parse `YYYY-MM-DDTHH:MM[:SS[.fff]]`, with or without a zone suffix.
/// A suffix is dropped and the wall clock kept.
pub fn parse_timestamp(ts: &str) -> Option<NaiveDateTime> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }

    ts.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M").ok())
        .or_else(|| DateTime::parse_from_rfc3339(ts).ok().map(|dt| dt.naive_local()))
}

fn elapsed_ms(from: &str, to: &str) -> Option<i64> {
    let from = parse_timestamp(from)?;
    let to = parse_timestamp(to)?;
    Some((to - from).num_milliseconds())
}

/// `PT2H30M` -> `2h 30m`, `PT45M` -> `45m`, `PT3H` -> `3h `.
///
/// Only the restricted `PT#H#M` form is expected; a missing component is
/// simply left out, so an hours-only duration keeps its trailing space.
pub fn format_duration(iso: &str) -> String {
    if iso.is_empty() {
        return String::new();
    }
    iso.replacen("PT", "", 1).replacen('H', "h ", 1).replacen('M', "m", 1)
}

/// Ground time between an arrival and the next departure, e.g.
/// `1h 35m layover` or `50m layover`.
pub fn layover(arrive: &str, depart: &str) -> String {
    let Some(diff) = elapsed_ms(arrive, depart) else {
        return String::new();
    };

    let hours = diff.div_euclid(MS_PER_HOUR);
    let minutes = (diff % MS_PER_HOUR).div_euclid(MS_PER_MINUTE);

    if hours > 0 {
        format!("{}h {}m layover", hours, minutes)
    } else {
        format!("{}m layover", minutes)
    }
}

/// `+N` when at least N whole 24-hour periods separate the two timestamps.
///
/// This counts elapsed time, not calendar days: 23:00 to 01:00 the next day
/// gives an empty label.
pub fn day_offset(departure: &str, arrival: &str) -> String {
    match elapsed_ms(departure, arrival) {
        Some(diff) => {
            let days = diff.div_euclid(MS_PER_DAY);
            if days > 0 {
                format!("+{}", days)
            } else {
                String::new()
            }
        }
        None => String::new(),
    }
}

/// Total journey time as `#h #m`, both terms always present, minutes
/// rounded half-up and clamped at zero.
pub fn total_duration(departure: &str, arrival: &str) -> String {
    let Some(ms) = elapsed_ms(departure, arrival) else {
        return String::new();
    };

    let minutes = ((ms as f64 / MS_PER_MINUTE as f64) + 0.5).floor().max(0.0) as i64;
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// `HH:MM` wall-clock label
pub fn clock_label(ts: &str) -> String {
    parse_timestamp(ts)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// `Sep 6` style date label
pub fn date_label(ts: &str) -> String {
    parse_timestamp(ts)
        .map(|dt| dt.format("%b %-d").to_string())
        .unwrap_or_default()
}
