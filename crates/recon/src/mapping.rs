use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::AuditError;
use crate::header::normalize_header;
use crate::table::{clean_blank, Table};

/// Category prefixes payroll exports put in front of field headers,
/// e.g. `Voluntary Deduction : Dental`.
pub const DEFAULT_HEADER_PREFIXES: &[&str] = &[
    "Voluntary Deduction :",
    "Additional Hours :",
    "Additional Earnings :",
    "Direct Deposit :",
    "Memo :",
    "Memo -",
];

/// One correspondence: a side-A field name and the side-B field key it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MappingEntry {
    pub source: String,
    pub target: String,
}

/// How a mapping source name was found among side-A headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeaderMatch {
    Exact,
    CaseInsensitive,
    PrefixStripped,
    PrefixStrippedCaseInsensitive,
}

#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    entries: Vec<MappingEntry>,
    by_source: HashMap<String, usize>,
    by_source_ci: HashMap<String, usize>,
    prefixes: Vec<String>,
}

impl FieldMapping {
    /// Read the two designated columns of a mapping table.
    ///
    /// Both values are trimmed; rows with a blank source are dropped; a blank
    /// target falls back to the source; exact duplicate pairs collapse.
    pub fn from_table(table: &Table, source_column: &str, target_column: &str) -> Result<Self, AuditError> {
        let src_idx = table.find_column(source_column);
        let tgt_idx = table.find_column(target_column);

        let (src_idx, tgt_idx) = match (src_idx, tgt_idx) {
            (Some(s), Some(t)) => (s, t),
            (s, t) => {
                let mut missing = Vec::new();
                if s.is_none() {
                    missing.push(source_column.to_string());
                }
                if t.is_none() {
                    missing.push(target_column.to_string());
                }
                return Err(AuditError::MappingSchema {
                    missing,
                    found: table.columns().to_vec(),
                });
            }
        };

        let pairs = table
            .rows()
            .iter()
            .map(|row| (cell(row, src_idx), cell(row, tgt_idx)));
        let mapping = Self::from_pairs(pairs);
        log::debug!(
            "mapping '{}': {} entr(ies) from {} row(s)",
            table.name(),
            mapping.len(),
            table.len()
        );
        Ok(mapping)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut mapping = Self {
            prefixes: DEFAULT_HEADER_PREFIXES.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        };
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for (source, target) in pairs {
            let source = clean_blank(source);
            if source.is_empty() {
                continue;
            }
            let target = match clean_blank(target) {
                "" => source,
                t => t,
            };
            if !seen.insert((source.to_string(), target.to_string())) {
                continue;
            }

            let idx = mapping.entries.len();
            mapping.entries.push(MappingEntry {
                source: source.to_string(),
                target: target.to_string(),
            });
            mapping.by_source.entry(source.to_string()).or_insert(idx);
            mapping.by_source_ci.entry(source.to_lowercase()).or_insert(idx);
        }

        mapping
    }

    /// Replace the recognised header prefixes.
    pub fn with_prefixes(mut self, prefixes: &[String]) -> Self {
        self.prefixes = prefixes.to_vec();
        self
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a source name: exact first, then case-insensitive. First insertion wins.
    pub fn lookup(&self, source: &str) -> Option<&MappingEntry> {
        self.by_source
            .get(source)
            .or_else(|| self.by_source_ci.get(&source.to_lowercase()))
            .map(|&i| &self.entries[i])
    }

    /// Strip one recognised category prefix, case-insensitively.
    pub fn strip_prefix<'a>(&self, header: &'a str) -> &'a str {
        for prefix in &self.prefixes {
            if let Some(head) = header.get(..prefix.len()) {
                if head.eq_ignore_ascii_case(prefix) {
                    return header[prefix.len()..].trim();
                }
            }
        }
        header
    }

    /// Find the side-A column for a mapping source name.
    ///
    /// Priority across the whole header list: exact, case-insensitive,
    /// prefix-stripped exact, prefix-stripped case-insensitive.
    pub fn source_column(&self, table: &Table, source: &str) -> Option<(usize, HeaderMatch)> {
        let wanted = normalize_header(source);
        let wanted_stripped = self.strip_prefix(&wanted).to_string();
        let stripped: Vec<&str> = table.columns().iter().map(|c| self.strip_prefix(c)).collect();

        let levels = [
            HeaderMatch::Exact,
            HeaderMatch::CaseInsensitive,
            HeaderMatch::PrefixStripped,
            HeaderMatch::PrefixStrippedCaseInsensitive,
        ];
        for level in levels {
            for (i, col) in table.columns().iter().enumerate() {
                let hit = match level {
                    HeaderMatch::Exact => *col == wanted,
                    HeaderMatch::CaseInsensitive => col.eq_ignore_ascii_case(&wanted),
                    HeaderMatch::PrefixStripped => stripped[i] == wanted_stripped,
                    HeaderMatch::PrefixStrippedCaseInsensitive => {
                        stripped[i].eq_ignore_ascii_case(&wanted_stripped)
                    }
                };
                if hit {
                    return Some((i, level));
                }
            }
        }
        None
    }
}

fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(String::as_str).unwrap_or("")
}
