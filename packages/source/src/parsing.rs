//! Shared parsing utilities for source rows.
//!
//! Origins publish dates as ISO-8601, `dd/mm/YYYY` or `dd/mm/YYYY HH:MM[:SS]`.
//! Rows whose date cannot be read keep the row and fall back to the current
//! time, with a warning.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use spotlight_complaint_models::parse_iso_timestamp;

/// Parses a source-native date string.
#[must_use]
pub fn parse_source_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = parse_iso_timestamp("date", s) {
        return Some(dt);
    }
    for format in ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses a source-native date, substituting the current time when the
/// text is unreadable.
#[must_use]
pub fn date_or_now(label: &str, s: &str) -> DateTime<Utc> {
    parse_source_date(s).unwrap_or_else(|| {
        log::warn!("[{label}] Unreadable date '{s}', using current time");
        Utc::now()
    })
}
