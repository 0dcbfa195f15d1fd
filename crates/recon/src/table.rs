use std::collections::HashSet;

use crate::header::normalize_header;

/// Ordered named columns over ordered rows of string cells.
///
/// Headers are normalized on construction. When two headers normalize to the
/// same name the first one wins lookups; later duplicates stay in the row data
/// but are unreachable by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        let name = name.into();
        let columns: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let mut seen = HashSet::new();
        for col in &columns {
            if !col.is_empty() && !seen.insert(col.as_str()) {
                log::warn!("{name}: duplicate column '{col}', first occurrence is used");
            }
        }

        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut table = Self::new(name, headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row, padding or truncating it to the table width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Exact lookup on the normalized header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.columns.iter().position(|c| *c == wanted)
    }

    /// Case-insensitive lookup on the normalized header.
    pub fn column_index_ci(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name).to_lowercase();
        self.columns.iter().position(|c| c.to_lowercase() == wanted)
    }

    /// Exact lookup first, then case-insensitive.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.column_index(name).or_else(|| self.column_index_ci(name))
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Cleaned values of one column, in row order.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |r| clean_blank(r.get(col).map(|s| s.as_str()).unwrap_or("")))
    }
}

/// Trim a cell and fold the null spellings exports use (`nan`, `none`, `null`) to blank.
pub fn clean_blank(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("null")
    {
        return "";
    }
    trimmed
}

pub fn is_blank(value: &str) -> bool {
    clean_blank(value).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn headers_are_normalized() {
        let t = Table::new("t", headers(&["  Employee\nID ", "Pay   Date"]));
        assert_eq!(t.columns(), &["Employee ID", "Pay Date"]);
        assert_eq!(t.column_index("Employee ID"), Some(0));
        assert_eq!(t.column_index("employee id"), None);
        assert_eq!(t.column_index_ci("employee id"), Some(0));
    }

    #[test]
    fn duplicate_headers_resolve_to_first() {
        let t = Table::from_rows(
            "t",
            headers(&["id", "amount", "amount"]),
            vec![vec!["1".into(), "10".into(), "20".into()]],
        );
        let idx = t.column_index("amount").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(t.cell(0, idx), "10");
    }

    #[test]
    fn rows_are_padded_to_width() {
        let mut t = Table::new("t", headers(&["a", "b", "c"]));
        t.push_row(vec!["1".into()]);
        t.push_row(vec!["1".into(), "2".into(), "3".into(), "4".into()]);
        assert_eq!(t.rows()[0].len(), 3);
        assert_eq!(t.rows()[1].len(), 3);
        assert_eq!(t.cell(0, 2), "");
        assert_eq!(t.cell(9, 0), "");
    }

    #[test]
    fn clean_blank_folds_null_spellings() {
        assert_eq!(clean_blank("  NaN "), "");
        assert_eq!(clean_blank("None"), "");
        assert_eq!(clean_blank("null"), "");
        assert_eq!(clean_blank(" 42 "), "42");
        assert!(is_blank("   "));
        assert!(!is_blank("0"));
    }
}
