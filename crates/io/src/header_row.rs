use payrecon::table::is_blank;
use payrecon::{AuditError, Table};

/// Build a Table from raw records, taking the first row with any non-blank
/// cell as the header. Rows that are entirely blank are dropped.
pub(crate) fn table_from_records(name: &str, records: Vec<Vec<String>>) -> Result<Table, AuditError> {
    let mut records = records.into_iter().skip_while(|r| r.iter().all(|c| is_blank(c)));

    let headers = records.next().ok_or_else(|| AuditError::Load {
        file: name.to_string(),
        message: "no header row found (file is empty or all rows are blank)".into(),
    })?;

    let mut table = Table::new(name, headers);
    let mut dropped = 0usize;
    for row in records {
        if row.iter().all(|c| is_blank(c)) {
            dropped += 1;
            continue;
        }
        table.push_row(row);
    }
    if dropped > 0 {
        log::debug!("{name}: skipped {dropped} blank row(s)");
    }
    log::debug!("{name}: {} column(s), {} row(s)", table.width(), table.len());
    Ok(table)
}
