// Cell normalization and small calendar/formatting helpers.
//
// This module centralizes all the "dirty" spreadsheet handling so the
// loaders can assume clean, typed values. Every normalizer is total: a bad
// cell turns into a safe default, never an error.
use chrono::{Datelike, Days, NaiveDate, Weekday};
use num_format::{Locale, ToFormattedString};

/// One spreadsheet cell after it left the parsing library.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl CellValue {
    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Trimmed string form of any cell; `""` for empty cells.
pub fn normalize_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.trim().to_string(),
        // `Display` for f64 drops the trailing `.0` on integral values,
        // which is how a plate or id typed as a number should read back.
        CellValue::Number(n) => n.to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Date(d) => iso_date(*d),
    }
}

/// Forgiving numeric coercion.
///
/// - Empty cells and anything that does not parse become `0.0`.
/// - Text is trimmed before parsing.
/// - Non-finite results (`inf`, `NaN`) also become `0.0`.
///
/// A literal zero and an invalid cell are indistinguishable in the output.
pub fn normalize_number(value: &CellValue) -> f64 {
    let n = match value {
        CellValue::Empty | CellValue::Date(_) => 0.0,
        CellValue::Number(n) => *n,
        CellValue::Bool(b) => f64::from(u8::from(*b)),
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Normalize a date cell to ISO `YYYY-MM-DD`.
///
/// Text is returned untouched, so callers must tolerate whatever string
/// format the export used. Numbers are spreadsheet serial days.
pub fn normalize_date(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) => s.clone(),
        CellValue::Number(serial) => serial_to_date(*serial).map(iso_date).unwrap_or_default(),
        CellValue::Date(d) => iso_date(*d),
        CellValue::Empty | CellValue::Bool(_) => String::new(),
    }
}

// Serial days count from 1900-01-01, but the format treats 1900 as a leap
// year and starts counting at 1, so real dates sit two days earlier.
const SERIAL_EPOCH_OFFSET: i64 = 2;
// Keeps the day arithmetic well inside chrono's range.
const MAX_SERIAL_MAGNITUDE: f64 = 3_000_000.0;

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial.abs() > MAX_SERIAL_MAGNITUDE {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)?;
    let offset = serial.floor() as i64 - SERIAL_EPOCH_OFFSET;
    if offset >= 0 {
        epoch.checked_add_days(Days::new(offset as u64))
    } else {
        epoch.checked_sub_days(Days::new(offset.unsigned_abs()))
    }
}

pub fn iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Zero-padded day-of-month key used by the daily status maps.
pub fn day_key(day: u32) -> String {
    format!("{:02}", day)
}

/// Days in a 0-indexed month, or `None` when the month/year is out of range.
pub fn days_in_month(year: i32, month0: u32) -> Option<u32> {
    if month0 > 11 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
    let next = if month0 == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month0 + 2, 1)?
    };
    Some((next - first).num_days() as u32)
}

pub fn is_weekend(d: NaiveDate) -> bool {
    matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Whole-number percentage, rounded half up.
pub fn percent_of(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

pub fn format_percent(pct: u32) -> String {
    format!("{}%", pct)
}

/// A 0-1 performance ratio as a percentage with one decimal, e.g. `95.0%`.
pub fn format_performance(ratio: f64) -> String {
    format!("{}%", format_number(ratio * 100.0, 1))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus thousands separators (e.g. `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `1,204 rows loaded`.
    n.to_formatted_string(&Locale::en)
}
