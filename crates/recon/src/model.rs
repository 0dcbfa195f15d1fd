use std::collections::BTreeMap;

use serde::Serialize;

use crate::dictionary::ReferenceDictionaries;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The two systems of record being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "side A"),
            Self::B => write!(f, "side B"),
        }
    }
}

/// Pre-loaded tables for one run. Side A is always wide; side B may be long
/// and is pivoted by the engine according to the profile.
pub struct AuditInput {
    pub side_a: Table,
    pub side_b: Table,
    pub mapping: Table,
    pub dictionaries: ReferenceDictionaries,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Match,
    Mismatch,
    ValueMissingOnA,
    ValueMissingOnB,
    EmployeeMissingOnA,
    EmployeeMissingOnB,
    ColumnMissingOnA,
    ColumnMissingOnB,
}

impl Status {
    /// Declared order; report columns follow it.
    pub const ALL: [Status; 8] = [
        Status::Match,
        Status::Mismatch,
        Status::ValueMissingOnA,
        Status::ValueMissingOnB,
        Status::EmployeeMissingOnA,
        Status::EmployeeMissingOnB,
        Status::ColumnMissingOnA,
        Status::ColumnMissingOnB,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Mismatch => "mismatch",
            Self::ValueMissingOnA => "value_missing_on_a",
            Self::ValueMissingOnB => "value_missing_on_b",
            Self::EmployeeMissingOnA => "employee_missing_on_a",
            Self::EmployeeMissingOnB => "employee_missing_on_b",
            Self::ColumnMissingOnA => "column_missing_on_a",
            Self::ColumnMissingOnB => "column_missing_on_b",
        }
    }

    /// Every non-`Match` status counts toward mismatch totals.
    pub fn is_mismatch(&self) -> bool {
        !matches!(self, Self::Match)
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// Human label using the profile's system names.
    pub fn label(&self, side_a: &str, side_b: &str) -> String {
        match self {
            Self::Match => "Data Match".into(),
            Self::Mismatch => "Data Mismatch".into(),
            Self::ValueMissingOnA => format!("Value missing in {side_a} ({side_b} has value)"),
            Self::ValueMissingOnB => format!("Value missing in {side_b} ({side_a} has value)"),
            Self::EmployeeMissingOnA => format!("Employee ID Not Found in {side_a}"),
            Self::EmployeeMissingOnB => format!("Employee ID Not Found in {side_b}"),
            Self::ColumnMissingOnA => format!("Column Missing in {side_a} Sheet"),
            Self::ColumnMissingOnB => format!("Column Missing in {side_b} Sheet"),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-employee context carried from side A into the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployeeContext {
    pub employment_status: String,
    pub state: String,
    pub first_name: String,
    pub last_name: String,
}

/// One (employee x mapped field) comparison. Built once by the comparator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub employee_id: String,
    pub field_key: String,
    pub field_label: String,
    /// Side-A column the mapping entry resolved to, if any.
    pub source_column: Option<String>,
    pub value_a_raw: String,
    pub value_b_raw: String,
    pub value_a_norm: String,
    pub value_b_norm: String,
    pub status: Status,
    pub rule: String,
    pub is_active: bool,
    #[serde(flatten)]
    pub context: EmployeeContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A row was emitted as `Mismatch` because it could not be classified cleanly.
    AmbiguousClassification,
    /// A mapping entry names a side-A column that does not exist.
    UnmappedColumn,
    /// An employee id occurs on more than one row of a wide table.
    DuplicateEmployee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditWarning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_key: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub employees_a: usize,
    pub employees_b: usize,
    pub employees_in_both: usize,
    pub employees_only_a: usize,
    pub employees_only_b: usize,
    pub employees_total: usize,
    pub fields_compared: usize,
    pub total_comparisons: usize,
    pub total_mismatches: usize,
    pub active_mismatches: usize,
    pub employees_with_mismatch: usize,
    pub active_employees_with_mismatch: usize,
    pub status_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: Status,
    pub count: usize,
}

/// One row of the field x status cross-tab. `counts` follows `Status::ALL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummaryRow {
    pub field_key: String,
    pub field_label: String,
    pub counts: Vec<StatusCount>,
    pub total: usize,
}

impl FieldSummaryRow {
    pub fn count(&self, status: Status) -> usize {
        self.counts
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

/// An employee present on one side only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEmployee {
    pub employee_id: String,
    pub missing_on: Side,
    #[serde(flatten)]
    pub context: EmployeeContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub meta: AuditMeta,
    pub summary: AuditSummary,
    pub field_summary: Vec<FieldSummaryRow>,
    pub detail: Vec<ComparisonRow>,
    pub missing: Vec<MissingEmployee>,
    pub warnings: Vec<AuditWarning>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditMeta {
    pub profile_name: String,
    pub side_a_label: String,
    pub side_b_label: String,
    pub engine_version: String,
    pub run_at: String,
}
