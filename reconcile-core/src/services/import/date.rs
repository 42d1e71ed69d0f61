//! Date normalizer - heterogeneous statement dates to calendar dates
//!
//! Encodings are tried in a fixed priority order, each falling through to
//! the next on no match:
//!
//! 1. native date cells (taken at face value, no timezone shifting)
//! 2. ISO `YYYY-MM-DD`, optional time suffix
//! 3. `DD/MM/YYYY`, optional time suffix
//! 4. `DD/MM/YY` (`>= 70` is 19xx, otherwise 20xx)
//! 5. `DD-MM-YYYY`
//! 6. `YYYY/MM/DD`
//! 7. `DD de <mês> de YYYY`
//! 8. spreadsheet serial day numbers above 30000 (epoch 1899-12-30)

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;

use super::text::fold;
use crate::domain::RawCell;

/// Serial numbers at or below this are treated as plain numbers, not dates
const SERIAL_THRESHOLD: f64 = 30000.0;

/// Serial day number of 2100-12-31, the last accepted date
const MAX_SERIAL: f64 = 73415.0;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "marco", "abril", "maio", "junho",
    "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
];

static ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T\s].*)?$").unwrap());
static DMY_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s.*)?$").unwrap());
static DMY_SLASH_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2})(?:\s.*)?$").unwrap());
static DMY_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})(?:\s.*)?$").unwrap());
static YMD_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})(?:\s.*)?$").unwrap());
static LONG_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s+de\s+([a-z]+)\s+de\s+(\d{4})$").unwrap());
static SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:[.,]\d+)?$").unwrap());

/// Parse a cell into a calendar date, or `None` if no encoding matches
/// or the components are out of range
pub fn normalize_date(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Date(d) => Some(*d),
        RawCell::DateTime(dt) => Some(dt.date()),
        RawCell::Number(n) => from_serial(*n),
        RawCell::Text(s) => parse_text(s.trim()),
        RawCell::Empty => None,
    }
}

fn parse_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    parse_iso(s)
        .or_else(|| parse_dmy_slash(s))
        .or_else(|| parse_dmy_slash_short(s))
        .or_else(|| parse_dmy_dash(s))
        .or_else(|| parse_ymd_slash(s))
        .or_else(|| parse_long_form(s))
        .or_else(|| parse_serial_text(s))
}

fn captures(re: &Regex, s: &str) -> Option<(u32, u32, u32)> {
    let caps = re.captures(s)?;
    let a = caps.get(1)?.as_str().parse().ok()?;
    let b = caps.get(2)?.as_str().parse().ok()?;
    let c = caps.get(3)?.as_str().parse().ok()?;
    Some((a, b, c))
}

fn parse_iso(s: &str) -> Option<NaiveDate> {
    let (y, m, d) = captures(&ISO, s)?;
    build_date(y as i32, m, d)
}

fn parse_dmy_slash(s: &str) -> Option<NaiveDate> {
    let (d, m, y) = captures(&DMY_SLASH, s)?;
    build_date(y as i32, m, d)
}

fn parse_dmy_slash_short(s: &str) -> Option<NaiveDate> {
    let (d, m, yy) = captures(&DMY_SLASH_SHORT, s)?;
    let year = if yy >= 70 { 1900 + yy } else { 2000 + yy };
    build_date(year as i32, m, d)
}

fn parse_dmy_dash(s: &str) -> Option<NaiveDate> {
    let (d, m, y) = captures(&DMY_DASH, s)?;
    build_date(y as i32, m, d)
}

fn parse_ymd_slash(s: &str) -> Option<NaiveDate> {
    let (y, m, d) = captures(&YMD_SLASH, s)?;
    build_date(y as i32, m, d)
}

fn parse_long_form(s: &str) -> Option<NaiveDate> {
    let folded = fold(s);
    let caps = LONG_FORM.captures(&folded)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month_name = caps.get(2)?.as_str();
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    build_date(year, month, day)
}

fn parse_serial_text(s: &str) -> Option<NaiveDate> {
    if !SERIAL.is_match(s) {
        return None;
    }
    let serial: f64 = s.replace(',', ".").parse().ok()?;
    from_serial(serial)
}

/// Spreadsheet serial day number to date; the fractional part is a time of
/// day and is ignored
fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= SERIAL_THRESHOLD || serial.trunc() > MAX_SERIAL {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::try_days(serial.trunc() as i64)?)?;
    let year = chrono::Datelike::year(&date);
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Some(date)
    } else {
        None
    }
}

/// Validate components and build the date; never clamps or wraps
fn build_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
