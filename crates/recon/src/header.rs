//! Header canonicalization and the column-role resolver.
//!
//! Every "which column is the employee id" question goes through one table of
//! roles, each an ordered list of candidate predicates. Candidates are tried in
//! priority order; within a candidate, columns are tried left to right. The
//! first hit wins.

use crate::error::AuditError;
use crate::model::Side;
use crate::table::Table;

/// Trim and collapse internal whitespace (including newlines) to single spaces.
pub fn normalize_header(header: &str) -> String {
    header.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, underscores read as spaces. Predicates match against this form.
fn fold(header: &str) -> String {
    normalize_header(&header.replace('_', " ")).to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPredicate {
    /// Whole header equals the phrase.
    Exact(String),
    /// Header contains the phrase.
    Contains(String),
    /// Header contains every word in `all` and none in `excluding`.
    AllOf { all: Vec<String>, excluding: Vec<String> },
}

impl ColumnPredicate {
    pub fn exact(phrase: &str) -> Self {
        Self::Exact(fold(phrase))
    }

    pub fn contains(phrase: &str) -> Self {
        Self::Contains(fold(phrase))
    }

    pub fn all_of(all: &[&str]) -> Self {
        Self::AllOf {
            all: all.iter().map(|w| fold(w)).collect(),
            excluding: Vec::new(),
        }
    }

    pub fn all_of_excluding(all: &[&str], excluding: &[&str]) -> Self {
        Self::AllOf {
            all: all.iter().map(|w| fold(w)).collect(),
            excluding: excluding.iter().map(|w| fold(w)).collect(),
        }
    }

    fn matches(&self, folded: &str) -> bool {
        match self {
            Self::Exact(phrase) => folded == phrase,
            Self::Contains(phrase) => folded.contains(phrase.as_str()),
            Self::AllOf { all, excluding } => {
                all.iter().all(|w| folded.contains(w.as_str()))
                    && !excluding.iter().any(|w| folded.contains(w.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRole {
    pub name: &'static str,
    pub candidates: Vec<ColumnPredicate>,
}

impl ColumnRole {
    /// Resolve against a header list. Deterministic: candidate order, then column order.
    pub fn resolve(&self, columns: &[String]) -> Option<usize> {
        let folded: Vec<String> = columns.iter().map(|c| fold(c)).collect();
        self.candidates
            .iter()
            .find_map(|pred| folded.iter().position(|c| pred.matches(c)))
    }

    pub fn employee_id() -> Self {
        Self {
            name: "employee_id",
            candidates: vec![
                ColumnPredicate::exact("Employee_Code"),
                ColumnPredicate::exact("Employee ID"),
                ColumnPredicate::exact("Emp ID"),
                ColumnPredicate::exact("Associate ID"),
                ColumnPredicate::all_of(&["associate", "id"]),
                ColumnPredicate::all_of(&["employee", "id"]),
                ColumnPredicate::all_of(&["employee", "code"]),
            ],
        }
    }

    pub fn status() -> Self {
        Self {
            name: "status",
            candidates: vec![
                ColumnPredicate::exact("Employee_Status"),
                ColumnPredicate::exact("Status"),
                ColumnPredicate::exact("Position Status"),
                ColumnPredicate::all_of_excluding(&["status"], &["filing", "marital"]),
            ],
        }
    }

    pub fn state() -> Self {
        Self {
            name: "state",
            candidates: vec![
                ColumnPredicate::exact("State"),
                ColumnPredicate::exact("Work_State"),
                ColumnPredicate::exact("Home_State"),
                ColumnPredicate::exact("State_Abbreviation"),
            ],
        }
    }

    pub fn first_name() -> Self {
        Self {
            name: "first_name",
            candidates: vec![
                ColumnPredicate::exact("First_Name"),
                ColumnPredicate::exact("FirstName"),
                ColumnPredicate::exact("Employee_First_Name"),
                ColumnPredicate::all_of(&["first", "name"]),
            ],
        }
    }

    pub fn last_name() -> Self {
        Self {
            name: "last_name",
            candidates: vec![
                ColumnPredicate::exact("Last_Name"),
                ColumnPredicate::exact("LastName"),
                ColumnPredicate::exact("Employee_Last_Name"),
                ColumnPredicate::all_of(&["last", "name"]),
            ],
        }
    }

    pub fn field_key() -> Self {
        Self {
            name: "field_key",
            candidates: vec![
                ColumnPredicate::exact("withholding_field_key"),
                ColumnPredicate::exact("field_key"),
                ColumnPredicate::all_of(&["field", "key"]),
                ColumnPredicate::all_of(&["deduction", "code"]),
                ColumnPredicate::all_of(&["deduction", "name"]),
            ],
        }
    }

    pub fn field_value() -> Self {
        Self {
            name: "field_value",
            candidates: vec![
                ColumnPredicate::exact("withholding_field_value"),
                ColumnPredicate::exact("field_value"),
                ColumnPredicate::all_of(&["field", "value"]),
                ColumnPredicate::contains("amount"),
                ColumnPredicate::contains("percent"),
                ColumnPredicate::contains("rate"),
            ],
        }
    }
}

/// Resolve one role binding on a table.
///
/// An explicit column name must exist (exact, then case-insensitive) or the
/// run fails; without one the role table's heuristics are used.
pub fn resolve_binding(
    table: &Table,
    side: Side,
    role: &ColumnRole,
    explicit: Option<&str>,
) -> Result<Option<usize>, AuditError> {
    match explicit {
        Some(name) => table.find_column(name).map(Some).ok_or_else(|| AuditError::SourceSchema {
            side,
            role: role.name.into(),
            column: Some(name.into()),
            found: table.columns().to_vec(),
        }),
        None => Ok(role.resolve(table.columns())),
    }
}

/// Like [`resolve_binding`] but the role must resolve.
pub fn require_binding(
    table: &Table,
    side: Side,
    role: &ColumnRole,
    explicit: Option<&str>,
) -> Result<usize, AuditError> {
    resolve_binding(table, side, role, explicit)?.ok_or_else(|| AuditError::SourceSchema {
        side,
        role: role.name.into(),
        column: None,
        found: table.columns().to_vec(),
    })
}
