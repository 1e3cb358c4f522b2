//! Cleanup of free-typed spreadsheet values.
//!
//! Reference and serial columns are typed by hand in the intake sheet, so a
//! client ID like `7` routinely comes back from the loader as `7.0`. Every
//! identifier comparison in the crate goes through [`normalize_id`] first.

/// A single spreadsheet cell as handed over by a loader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::Text(s.clone())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

// Beyond this the f64 -> i64 cast stops being exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn whole_number(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
        Some(n as i64)
    } else {
        None
    }
}

/// Normalize an identifier cell to a comparable string.
///
/// * empty, NaN and the literal text `nan` become `""`
/// * anything that reads as a whole number (`7`, `"7.0"`) becomes `"7"`
/// * everything else is returned trimmed
///
/// # Examples
/// ```
/// use invoice_ledger::normalize::normalize_id;
///
/// assert_eq!(normalize_id("7.0"), "7");
/// assert_eq!(normalize_id(7), "7");
/// assert_eq!(normalize_id(None::<&str>), "");
/// assert_eq!(normalize_id("ABC-12"), "ABC-12");
/// ```
pub fn normalize_id(value: impl Into<CellValue>) -> String {
    match value.into() {
        CellValue::Empty => String::new(),
        CellValue::Number(n) if n.is_nan() => String::new(),
        CellValue::Number(n) => match whole_number(n) {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                return String::new();
            }
            match trimmed.parse::<f64>().ok().and_then(whole_number) {
                Some(i) => i.to_string(),
                None => trimmed.to_string(),
            }
        }
    }
}

/// Referral columns carry `nan`/`none` placeholders from the loader; drop them.
pub fn clean_referral_field(value: impl Into<CellValue>) -> String {
    let text = clean_text(value);
    if text.eq_ignore_ascii_case("nan") || text.eq_ignore_ascii_case("none") {
        String::new()
    } else {
        text
    }
}

/// Trimmed text form of a cell.
pub fn clean_text(value: impl Into<CellValue>) -> String {
    match value.into() {
        CellValue::Empty => String::new(),
        CellValue::Number(n) if n.is_nan() => String::new(),
        CellValue::Number(n) => match whole_number(n) {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        CellValue::Text(s) => s.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_coerced_ids_collapse_to_integers() {
        assert_eq!(normalize_id("7.0"), "7");
        assert_eq!(normalize_id(" 42.0 "), "42");
        assert_eq!(normalize_id(7.0_f64), "7");
        assert_eq!(normalize_id(7), "7");
    }

    #[test]
    fn missing_values_become_empty() {
        assert_eq!(normalize_id(None::<&str>), "");
        assert_eq!(normalize_id(CellValue::Empty), "");
        assert_eq!(normalize_id(f64::NAN), "");
        assert_eq!(normalize_id("NaN"), "");
        assert_eq!(normalize_id("   "), "");
    }

    #[test]
    fn non_numeric_ids_are_trimmed_only() {
        assert_eq!(normalize_id("ABC-12"), "ABC-12");
        assert_eq!(normalize_id("  PUN-240101-003 "), "PUN-240101-003");
        assert_eq!(normalize_id("7.5"), "7.5");
        assert_eq!(normalize_id(7.5), "7.5");
    }

    #[test]
    fn referral_placeholders_are_dropped() {
        assert_eq!(clean_referral_field("None"), "");
        assert_eq!(clean_referral_field("nan"), "");
        assert_eq!(clean_referral_field(" R-11 "), "R-11");
        assert_eq!(clean_referral_field(None::<String>), "");
    }

    #[test]
    fn clean_text_keeps_leading_zeros() {
        assert_eq!(clean_text(" 0001 "), "0001");
        assert_eq!(clean_text(3), "3");
    }
}
