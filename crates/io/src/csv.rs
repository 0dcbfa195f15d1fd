// Delimited text import (CSV/TSV/TXT) and Detail CSV export

use std::io::Write;

use payrecon::{AuditError, AuditResult, Table};

use crate::header_row;

/// Decode upload bytes: UTF-8 (BOM stripped), falling back to Windows-1252
/// for Excel-exported text.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            log::debug!("input is not UTF-8; decoded as Windows-1252");
            decoded.into_owned()
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// Tab wins whenever it splits the first line. Otherwise each candidate
/// (semicolon, comma, pipe) is scored by how many sample lines share the first
/// line's field count, times that count.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();
    if sample_lines.is_empty() {
        return b',';
    }

    let field_counts = |delim: u8| -> Vec<usize> {
        sample_lines
            .iter()
            .map(|line| {
                ::csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect()
    };

    if field_counts(b'\t').first().copied().unwrap_or(0) > 1 {
        return b'\t';
    }

    let mut best = b',';
    let mut best_score = 0u64;
    for &delim in &[b';', b',', b'|'] {
        let counts = field_counts(delim);
        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }
    best
}

/// Parse delimited text into a Table. Every cell stays a string.
///
/// Leading blank rows are skipped; the header is the first row with any
/// non-blank cell. Fully blank data rows are dropped.
pub fn parse_delimited(name: &str, content: &str, delimiter: u8) -> Result<Table, AuditError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AuditError::Load {
            file: name.to_string(),
            message: format!("row {}: {e}", i + 1),
        })?;
        records.push(record.iter().map(String::from).collect());
    }

    header_row::table_from_records(name, records)
}

/// Detail table as CSV, one row per comparison.
pub fn write_detail_csv<W: Write>(result: &AuditResult, out: W) -> Result<(), AuditError> {
    let mut writer = ::csv::Writer::from_writer(out);
    let (a, b) = (&result.meta.side_a_label, &result.meta.side_b_label);

    let headers = crate::report::detail_headers(a, b);
    writer
        .write_record(&headers)
        .map_err(|e| AuditError::Export(e.to_string()))?;
    for row in &result.detail {
        writer
            .write_record(crate::report::detail_record(row, a, b))
            .map_err(|e| AuditError::Export(e.to_string()))?;
    }
    writer.flush().map_err(|e| AuditError::Export(e.to_string()))?;
    Ok(())
}
