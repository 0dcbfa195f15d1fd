// Workbook import (xlsx, xlsm, xlsb, xls, ods) via calamine

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};

use payrecon::{AuditError, Table};

use crate::header_row;

/// Which worksheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelector {
    #[default]
    First,
    /// Exact name, then case-insensitive.
    Named(String),
    /// First sheet whose lowercased name contains any keyword; first sheet otherwise.
    Keywords(Vec<String>),
}

impl SheetSelector {
    pub fn keywords<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Keywords(words.into_iter().map(|w| w.to_lowercase()).collect())
    }

    fn pick<'n>(&self, names: &'n [String]) -> Option<&'n String> {
        match self {
            Self::First => names.first(),
            Self::Named(wanted) => names
                .iter()
                .find(|n| *n == wanted)
                .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(wanted))),
            Self::Keywords(words) => names
                .iter()
                .find(|n| {
                    let lower = n.to_lowercase();
                    words.iter().any(|w| lower.contains(w.as_str()))
                })
                .or_else(|| names.first()),
        }
    }
}

/// List the worksheet names of a workbook.
pub fn sheet_names(name: &str, bytes: &[u8]) -> Result<Vec<String>, AuditError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| load_err(name, e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one worksheet into a Table. Every cell becomes a string.
pub fn read_workbook(name: &str, bytes: &[u8], selector: &SheetSelector) -> Result<Table, AuditError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| load_err(name, e))?;

    let names = workbook.sheet_names().to_vec();
    let sheet = selector.pick(&names).cloned().ok_or_else(|| AuditError::Load {
        file: name.to_string(),
        message: match selector {
            SheetSelector::Named(wanted) => format!("no sheet named '{wanted}'; sheets: {}", names.join(", ")),
            _ => "workbook has no sheets".into(),
        },
    })?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| load_err(name, format!("sheet '{sheet}': {e}")))?;
    log::debug!("{name}: reading sheet '{sheet}' ({} x {})", range.height(), range.width());

    let records: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    header_row::table_from_records(name, records)
}

fn load_err(name: &str, e: impl std::fmt::Display) -> AuditError {
    AuditError::Load {
        file: name.to_string(),
        message: e.to_string(),
    }
}

/// Render a cell the way it displays, without numeric coercion downstream.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                format!("{}", dt.as_f64())
            } else {
                excel_serial_to_string(dt.as_f64())
            }
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Excel serial date (1900 system, day 0 = 1899-12-30) as ISO text.
/// Whole days render as a date only.
fn excel_serial_to_string(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return format!("{}", serial);
    };
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    // serials past chrono's range stay numeric
    let at = Duration::try_days(days)
        .zip(Duration::try_seconds(seconds))
        .and_then(|(d, s)| epoch.checked_add_signed(d)?.checked_add_signed(s));
    let Some(at) = at else {
        return format!("{}", serial);
    };
    if seconds == 0 {
        at.format("%Y-%m-%d").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
