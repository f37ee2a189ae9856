//! Permissive date parsing for DATE fields.
//!
//! Human-entered dates arrive in many shapes. `dateparser` covers ISO 8601 /
//! RFC 3339, RFC 2822, `YYYY-MM-DD`, `Mon DD, YYYY`, `DD Mon YYYY`,
//! `MM/DD/YYYY` and unix timestamps; a few extra layouts are handled here.
//! Every result is normalized to a naive UTC wall clock with whole seconds.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};

/// Canonical wire format for dates: `1969-09-26T00:00:00`.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const EXTRA_DATE_LAYOUTS: &[&str] = &["%d.%m.%Y", "%d %B %Y", "%B %d %Y"];

/// Parse a date/time string, returning `None` if no known layout matches.
///
/// Date-only inputs resolve to midnight. Inputs carrying an offset are
/// converted to UTC before the offset is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let input = raw.trim();
    if input.is_empty() {
        return None;
    }
    let midnight = NaiveTime::from_hms_opt(0, 0, 0)?;

    // dateparser reads bare digits as a unix timestamp; a four digit value is a year.
    if input.len() == 4 && input.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = input.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(midnight));
    }

    if let Ok(dt) = dateparser::parse_with(input, &Utc, midnight) {
        return Some(dt.naive_utc().trunc_subsecs(0));
    }

    EXTRA_DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(input, layout).ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("1 {input}"), "%d %B %Y").ok())
        .map(|d| d.and_time(midnight))
}

pub fn format_date(dt: &NaiveDateTime) -> String {
    dt.format(DATE_FORMAT).to_string()
}
