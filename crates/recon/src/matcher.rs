use std::collections::{HashMap, HashSet};

use crate::config::KeyTransform;
use crate::table::{clean_blank, Table};

/// Employee id -> row index for one wide table.
#[derive(Debug, Clone, Default)]
pub struct EmployeeIndex {
    ids: Vec<String>,
    rows: HashMap<String, usize>,
    duplicates: Vec<String>,
}

impl EmployeeIndex {
    /// Index a wide table by its id column. Blank ids are skipped; a repeated
    /// id keeps its first row and is recorded in [`EmployeeIndex::duplicates`].
    pub fn build(table: &Table, id_col: usize, transform: KeyTransform) -> Self {
        let mut index = Self::default();
        let mut dup_seen = HashSet::new();

        for (r, row) in table.rows().iter().enumerate() {
            let raw = clean_blank(row.get(id_col).map(String::as_str).unwrap_or(""));
            let id = transform.apply(raw);
            if id.is_empty() {
                continue;
            }
            if index.rows.contains_key(&id) {
                if dup_seen.insert(id.clone()) {
                    index.duplicates.push(id);
                }
                continue;
            }
            index.rows.insert(id.clone(), r);
            index.ids.push(id);
        }

        index
    }

    /// Ids in first-seen order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn row(&self, id: &str) -> Option<usize> {
        self.rows.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}

/// Outer join of two employee sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeJoin {
    /// Side-A ids in encounter order, then side-B-only ids in encounter order.
    pub order: Vec<String>,
    pub in_both: Vec<String>,
    pub only_a: Vec<String>,
    pub only_b: Vec<String>,
}

impl EmployeeJoin {
    pub fn union_len(&self) -> usize {
        self.order.len()
    }
}

pub fn outer_join(a: &EmployeeIndex, b: &EmployeeIndex) -> EmployeeJoin {
    let mut join = EmployeeJoin::default();

    for id in a.ids() {
        join.order.push(id.clone());
        if b.contains(id) {
            join.in_both.push(id.clone());
        } else {
            join.only_a.push(id.clone());
        }
    }
    for id in b.ids() {
        if !a.contains(id) {
            join.order.push(id.clone());
            join.only_b.push(id.clone());
        }
    }

    log::debug!(
        "join: {} in both, {} only on side A, {} only on side B",
        join.in_both.len(),
        join.only_a.len(),
        join.only_b.len()
    );
    join
}
