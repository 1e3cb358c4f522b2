use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Date format used in ledger cells.
pub const LEDGER_DATE_FORMAT: &str = "%d-%m-%Y";

/// Timestamp format stamped into `Created At` / `Service Ended`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_FORMATS: [&str; 4] = ["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse a date cell in any of the layouts staff type into the sheets.
///
/// Timestamps (`2024-01-05 10:11:12`) are accepted too; the time is dropped.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for fmt in ACCEPTED_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Some(d);
        }
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.date())
}

/// `DD-MM-YYYY`
pub fn format_date_simple(date: NaiveDate) -> String {
    date.format(LEDGER_DATE_FORMAT).to_string()
}

/// Long form used on printed documents: `Jan. 1st 2024`.
pub fn format_date_with_suffix(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{} {}{} {}", date.format("%b."), day, suffix, date.year())
}

/// Long form for a raw cell; unparsable or placeholder values render as `N/A`.
pub fn format_cell_with_suffix(text: &str) -> String {
    let t = text.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("n/a") {
        return "N/A".to_string();
    }
    match parse_date(t) {
        Some(d) => format_date_with_suffix(d),
        None => t.to_string(),
    }
}
