// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" spreadsheet/number/date handling so
// the rest of the code can assume clean, typed values.
use chrono::{Days, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Header format of the daily availability columns, e.g. `01-Apr-25`.
pub const DAY_COLUMN_FORMAT: &str = "%d-%b-%y";

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace and stray apostrophes (text-forced numbers).
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim().trim_matches('\'').trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a calendar date. The refill log has been written both as
/// `YYYY-MM-DD` and as `DD-Mon-YY`, so both are accepted.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Timestamps such as `2025-04-01 00:00:00` keep only the date part.
    let s = s.split_whitespace().next().unwrap_or(s);
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, DAY_COLUMN_FORMAT))
        .ok()
}

/// Parse a daily column header (`01-Apr-25`). Anything else is not a date column.
pub fn parse_day_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), DAY_COLUMN_FORMAT).ok()
}

/// Convert a spreadsheet date serial (days since 1899-12-30) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.trunc() as u64))
}

pub fn days_diff(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// `"SILVER "` -> `"Silver"`, `"gold plus"` -> `"Gold Plus"`.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

/// Rupiah amounts are shown without decimals: `Rp 12,500,000`.
pub fn format_currency(n: f64) -> String {
    format!("Rp {}", format_number(n, 0))
}

/// Percentages are held as 0-100 values.
pub fn format_percent(pct: f64) -> String {
    format!("{:.2}%", pct)
}

pub fn format_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format_number(x, decimals)).unwrap_or_else(|| "-".to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_with_separators_and_apostrophes() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("'-6.2145")), Some(-6.2145));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parses_both_refill_date_layouts() {
        let d = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(parse_date_safe(Some("2025-04-01")), Some(d));
        assert_eq!(parse_date_safe(Some("01-Apr-25")), Some(d));
        assert_eq!(parse_date_safe(Some("2025-04-01 00:00:00")), Some(d));
        assert_eq!(parse_date_safe(Some("April first")), None);
    }

    #[test]
    fn day_labels_and_serials() {
        assert_eq!(parse_day_label("02-Apr-25"), NaiveDate::from_ymd_opt(2025, 4, 2));
        assert_eq!(parse_day_label("Remarks"), None);
        assert_eq!(excel_serial_to_date(45748.0), NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_currency(12_500_000.4), "Rp 12,500,000");
        assert_eq!(format_percent(95.0), "95.00%");
        assert_eq!(format_opt(None, 2), "-");
        assert_eq!(title_case("  SILVER  plus "), "Silver Plus");
    }
}
