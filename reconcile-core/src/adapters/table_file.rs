//! Tabular file reader - statement files to raw rows
//!
//! CSV/TXT exports are read with the `csv` crate, spreadsheets with
//! `calamine`. Nothing here interprets cell contents beyond the storage
//! type; header detection and normalization happen in the import service.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;

use crate::domain::{rows_from_grid, RawCell, RawRow};

const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Read the first table of a statement file
pub fn read_table(path: &Path) -> Result<Vec<RawRow>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" => read_delimited(path),
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path),
        other => Err(anyhow!(
            "Unsupported statement file type '{}': expected csv, txt, xlsx, xls or ods",
            other
        )),
    }
}

fn read_delimited(path: &Path) -> Result<Vec<RawRow>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_delimited(&decode(&bytes))
}

/// UTF-8 first; older bank exports are Latin-1
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parse delimited text into rows, detecting the delimiter
pub fn parse_delimited(content: &str) -> Result<Vec<RawRow>> {
    let delimiter = detect_delimiter(content);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    // The csv reader skips empty lines, so positions come from the record's
    // starting line rather than its ordinal
    let mut rows = Vec::new();
    for (ordinal, record) in reader.records().enumerate() {
        let record = record.context("Malformed delimited row")?;
        let index = record
            .position()
            .map(|p| p.line().saturating_sub(1) as usize)
            .unwrap_or(ordinal);
        rows.push(RawRow::new(index, record.iter().map(RawCell::text).collect()));
    }

    Ok(rows)
}

/// Most frequent delimiter on the first line that has any, defaulting to comma
fn detect_delimiter(content: &str) -> char {
    let line = content
        .lines()
        .find(|l| l.chars().any(|c| DELIMITERS.contains(&c)))
        .unwrap_or("");

    DELIMITERS
        .iter()
        .map(|d| (*d, line.matches(*d).count()))
        .filter(|(_, n)| *n > 0)
        // Ties keep the earlier delimiter
        .fold(None, |best: Option<(char, usize)>, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(d, _)| d)
        .unwrap_or(',')
}

fn read_workbook(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| anyhow!("Failed to open workbook {}: {}", path.display(), e))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Workbook {} has no sheets", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| anyhow!("Failed to read sheet '{}': {}", sheet, e))?;

    // Ranges start at the first used cell; pad so row positions match the sheet
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<RawCell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![RawCell::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }

    Ok(rows_from_grid(grid))
}

fn cell_from_data(data: &Data) -> RawCell {
    match data {
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::String(s) => RawCell::text(s.as_str()),
        // Fall back to the serial day number, which the date normalizer also reads
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(RawCell::DateTime)
            .unwrap_or(RawCell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => RawCell::text(s.as_str()),
        Data::DurationIso(s) => RawCell::text(s.as_str()),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::Error(_) | Data::Empty => RawCell::Empty,
    }
}
