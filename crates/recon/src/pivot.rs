use std::collections::HashMap;

use crate::table::{clean_blank, Table};

/// Pivot a long (id, key, value) table into one row per id and one column per key.
///
/// Ids and keys keep first-seen order. For a repeated (id, key) pair the last
/// non-blank value wins; if every value is blank the cell is blank. Rows with
/// a blank id or key are dropped. The id column keeps the name of the input's
/// id column.
pub fn pivot_long_to_wide(long: &Table, id_col: usize, key_col: usize, value_col: usize) -> Table {
    let mut ids: Vec<String> = Vec::new();
    let mut id_pos: HashMap<String, usize> = HashMap::new();
    let mut keys: Vec<String> = Vec::new();
    let mut key_pos: HashMap<String, usize> = HashMap::new();
    let mut cells: HashMap<(usize, usize), String> = HashMap::new();
    let mut dropped = 0usize;

    for row in long.rows() {
        let id = cell(row, id_col);
        let key = cell(row, key_col);
        if id.is_empty() || key.is_empty() {
            dropped += 1;
            continue;
        }

        let r = *id_pos.entry(id.to_string()).or_insert_with(|| {
            ids.push(id.to_string());
            ids.len() - 1
        });
        let c = *key_pos.entry(key.to_string()).or_insert_with(|| {
            keys.push(key.to_string());
            keys.len() - 1
        });

        let value = cell(row, value_col);
        let slot = cells.entry((r, c)).or_default();
        if !value.is_empty() {
            *slot = value.to_string();
        }
    }

    if dropped > 0 {
        log::debug!("{}: dropped {dropped} row(s) with blank id or key", long.name());
    }

    let id_header = long
        .columns()
        .get(id_col)
        .cloned()
        .unwrap_or_else(|| "employee_id".into());
    let mut headers = Vec::with_capacity(keys.len() + 1);
    headers.push(id_header);
    headers.extend(keys.iter().cloned());

    let mut wide = Table::new(long.name(), headers);
    for (r, id) in ids.iter().enumerate() {
        let mut out = Vec::with_capacity(keys.len() + 1);
        out.push(id.clone());
        for c in 0..keys.len() {
            out.push(cells.remove(&(r, c)).unwrap_or_default());
        }
        wide.push_row(out);
    }

    log::debug!(
        "{}: pivoted {} long row(s) into {} employee(s) x {} field(s)",
        long.name(),
        long.len(),
        ids.len(),
        keys.len()
    );
    wide
}

fn cell(row: &[String], i: usize) -> &str {
    clean_blank(row.get(i).map(String::as_str).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(rows: &[(&str, &str, &str)]) -> Table {
        Table::from_rows(
            "long",
            vec!["employee_id".into(), "field_key".into(), "field_value".into()],
            rows.iter()
                .map(|(a, b, c)| vec![a.to_string(), b.to_string(), c.to_string()])
                .collect(),
        )
    }

    #[test]
    fn one_row_per_id_one_column_per_key() {
        let t = long(&[
            ("100", "FIT_FILING_STATUS", "S"),
            ("100", "FIT_ADDL_AMOUNT", "2500"),
            ("200", "FIT_FILING_STATUS", "M"),
        ]);
        let wide = pivot_long_to_wide(&t, 0, 1, 2);
        assert_eq!(wide.columns(), &["employee_id", "FIT_FILING_STATUS", "FIT_ADDL_AMOUNT"]);
        assert_eq!(wide.len(), 2);
        assert_eq!(wide.rows()[0], vec!["100", "S", "2500"]);
        assert_eq!(wide.rows()[1], vec!["200", "M", ""]);
    }

    #[test]
    fn last_non_blank_wins() {
        let t = long(&[
            ("100", "DEN", "2500"),
            ("100", "DEN", "3000"),
            ("100", "DEN", "  "),
            ("100", "VIS", ""),
            ("100", "VIS", "nan"),
        ]);
        let wide = pivot_long_to_wide(&t, 0, 1, 2);
        assert_eq!(wide.rows()[0], vec!["100", "3000", ""]);
    }

    #[test]
    fn blank_ids_and_keys_are_dropped() {
        let t = long(&[("", "DEN", "1"), ("100", "", "2"), ("100", "DEN", "3")]);
        let wide = pivot_long_to_wide(&t, 0, 1, 2);
        assert_eq!(wide.len(), 1);
        assert_eq!(wide.width(), 2);
        assert_eq!(wide.rows()[0], vec!["100", "3"]);
    }

    #[test]
    fn empty_input_keeps_id_column() {
        let t = long(&[]);
        let wide = pivot_long_to_wide(&t, 0, 1, 2);
        assert!(wide.is_empty());
        assert_eq!(wide.columns(), &["employee_id"]);
    }
}
