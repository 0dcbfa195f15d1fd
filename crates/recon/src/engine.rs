use std::borrow::Cow;
use std::collections::HashMap;

use crate::aggregate::{compute_summary, field_summary, missing_roster};
use crate::classify::{classify_presence, compare_values, Presence};
use crate::config::{AuditProfile, KeyTransform, Layout, RoleBindings, Units};
use crate::error::AuditError;
use crate::header::{require_binding, resolve_binding, ColumnRole};
use crate::mapping::{FieldMapping, MappingEntry};
use crate::matcher::{outer_join, EmployeeIndex};
use crate::model::{
    AuditInput, AuditMeta, AuditResult, AuditWarning, ComparisonRow, EmployeeContext, Side, Status,
    WarningKind,
};
use crate::normalize::{NormalizedValue, Normalizer, ValueKind};
use crate::pivot::pivot_long_to_wide;
use crate::table::{clean_blank, Table};

/// Copy of `table` with its id column passed through `transform`, so ids that
/// differ only in formatting pivot into one employee.
fn with_keyed_ids(table: &Table, id_col: usize, transform: KeyTransform) -> Table {
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            if let Some(id) = row.get_mut(id_col) {
                *id = transform.apply(clean_blank(id));
            }
            row
        })
        .collect();
    Table::from_rows(table.name(), table.columns().to_vec(), rows)
}

/// Run one reconciliation. Schema problems fail before any comparison;
/// per-row ambiguities become warnings.
pub fn run(profile: &AuditProfile, input: &AuditInput) -> Result<AuditResult, AuditError> {
    profile.validate()?;

    let mapping = FieldMapping::from_table(
        &input.mapping,
        &profile.mapping.source_column,
        &profile.mapping.target_column,
    )?
    .with_prefixes(&profile.header_prefixes());

    // Side A: wide
    let a = &input.side_a;
    let a_id = require_binding(a, Side::A, &ColumnRole::employee_id(), profile.side_a.columns.employee_id.as_deref())?;
    let a_ctx_cols = ContextColumns::resolve(a, Side::A, &profile.side_a.columns)?;

    // Side B: wide, or long pivoted to wide
    let b_raw = &input.side_b;
    let b_cols = &profile.side_b.columns;
    let b_raw_id = require_binding(b_raw, Side::B, &ColumnRole::employee_id(), b_cols.employee_id.as_deref())?;
    let b_ctx_cols = ContextColumns::resolve(b_raw, Side::B, b_cols)?;
    let (b_wide, b_id): (Cow<'_, Table>, usize) = match profile.side_b.layout {
        Layout::Wide => (Cow::Borrowed(b_raw), b_raw_id),
        Layout::Long => {
            let key = require_binding(b_raw, Side::B, &ColumnRole::field_key(), b_cols.field_key.as_deref())?;
            let value = require_binding(b_raw, Side::B, &ColumnRole::field_value(), b_cols.field_value.as_deref())?;
            let keyed = with_keyed_ids(b_raw, b_raw_id, profile.side_b.key_transform);
            (Cow::Owned(pivot_long_to_wide(&keyed, b_raw_id, key, value)), 0)
        }
    };

    let active_col = match &profile.active.column {
        Some(name) => {
            let found = a.find_column(name);
            if found.is_none() {
                log::warn!("active column '{name}' not found on {}; every employee counts as active", Side::A);
            }
            found
        }
        None => a_ctx_cols.status,
    };

    let mut warnings = Vec::new();

    // Employees
    let idx_a = EmployeeIndex::build(a, a_id, profile.side_a.key_transform);
    let idx_b = EmployeeIndex::build(&b_wide, b_id, profile.side_b.key_transform);
    for (side, idx) in [(Side::A, &idx_a), (Side::B, &idx_b)] {
        for id in idx.duplicates() {
            log::warn!("{side}: employee '{id}' appears on more than one row; first row is used");
            warnings.push(AuditWarning {
                kind: WarningKind::DuplicateEmployee,
                employee_id: Some(id.clone()),
                field_key: None,
                message: format!("employee '{id}' appears on more than one {side} row; first row is used"),
            });
        }
    }
    let join = outer_join(&idx_a, &idx_b);

    let context_a = a_ctx_cols.collect(a, a_id, profile.side_a.key_transform);
    let context_b = b_ctx_cols.collect(b_raw, b_raw_id, profile.side_b.key_transform);

    // Fields
    let filing = input.dictionaries.filing_status.as_ref();
    let normalizer = Normalizer::new(profile, filing);
    let plans: Vec<FieldPlan<'_>> = mapping
        .entries()
        .iter()
        .map(|entry| FieldPlan::resolve(entry, &mapping, a, &b_wide, &normalizer))
        .collect();

    for plan in plans.iter().filter(|p| p.col_a.is_none()) {
        warnings.push(AuditWarning {
            kind: WarningKind::UnmappedColumn,
            employee_id: None,
            field_key: Some(plan.entry.target.clone()),
            message: format!(
                "mapping source '{}' not found in {} columns",
                plan.entry.source, profile.side_a_label
            ),
        });
    }
    for plan in plans.iter().filter(|p| p.col_b.is_none()) {
        log::debug!("field key '{}' not present on {}", plan.entry.target, Side::B);
    }

    // Compare
    let units_a = profile.side_a.units;
    let units_b = profile.side_b.units;
    let coded_a = profile.side_a.filing_status_codes;
    let coded_b = profile.side_b.filing_status_codes;

    let mut detail = Vec::with_capacity(join.order.len() * plans.len());
    for id in &join.order {
        let row_a = idx_a.row(id);
        let row_b = idx_b.row(id);
        let context = row_a
            .and_then(|_| context_a.get(id))
            .or_else(|| context_b.get(id))
            .cloned()
            .unwrap_or_default();

        let is_active = match (active_col, row_a) {
            (None, _) => true,
            (Some(col), Some(r)) => profile.active.is_active_value(a.cell(r, col)),
            (Some(_), None) => false,
        };

        for plan in &plans {
            let raw_a = match (row_a, plan.col_a) {
                (Some(r), Some(c)) => clean_blank(a.cell(r, c)),
                _ => "",
            };
            let raw_b = match (row_b, plan.col_b) {
                (Some(r), Some(c)) => clean_blank(b_wide.cell(r, c)),
                _ => "",
            };
            let norm_a = normalizer.normalize_value(plan.kind, raw_a, units_a, coded_a);
            let norm_b = normalizer.normalize_value(plan.kind, raw_b, units_b, coded_b);

            let presence = Presence {
                employee_on_a: row_a.is_some(),
                employee_on_b: row_b.is_some(),
                column_on_a: plan.col_a.is_some(),
                column_on_b: plan.col_b.is_some(),
            };

            let (status, value_a, value_b, rule) = match classify_presence(presence) {
                Some(status) => {
                    let rule = presence_rule(status, plan, profile);
                    (status, norm_a.value, norm_b.value, rule)
                }
                None => {
                    let verdict = compare_values(plan.kind, &norm_a, &norm_b);
                    if verdict.ambiguous {
                        let code = if norm_b.untranslated { raw_b } else { raw_a };
                        log::warn!(
                            "employee '{id}', field '{}': filing status code '{code}' not in dictionary",
                            plan.entry.target
                        );
                        warnings.push(AuditWarning {
                            kind: WarningKind::AmbiguousClassification,
                            employee_id: Some(id.clone()),
                            field_key: Some(plan.entry.target.clone()),
                            message: format!("filing status code '{code}' not found in dictionary; classified as mismatch"),
                        });
                    }
                    let rule = with_unit_note(verdict.rule, plan.kind, &norm_a, &norm_b, profile);
                    (verdict.status, verdict.value_a, verdict.value_b, rule)
                }
            };

            detail.push(ComparisonRow {
                employee_id: id.clone(),
                field_key: plan.entry.target.clone(),
                field_label: input.dictionaries.field_label(&plan.entry.target, &context.state),
                source_column: plan.source_column.clone(),
                value_a_raw: raw_a.to_string(),
                value_b_raw: raw_b.to_string(),
                value_a_norm: value_a,
                value_b_norm: value_b,
                status,
                rule,
                is_active,
                context: context.clone(),
            });
        }
    }

    let fields: Vec<(String, String)> = plans
        .iter()
        .map(|p| (p.entry.target.clone(), input.dictionaries.field_label(&p.entry.target, "")))
        .collect();
    let summary = compute_summary(&join, &detail, plans.len());
    let field_summary = field_summary(&fields, &detail);
    let missing = missing_roster(&join, &context_a, &context_b);

    log::info!(
        "{}: {} comparison(s), {} mismatch(es), {} employee(s) missing on one side",
        profile.name,
        summary.total_comparisons,
        summary.total_mismatches,
        missing.len()
    );

    Ok(AuditResult {
        meta: AuditMeta {
            profile_name: profile.name.clone(),
            side_a_label: profile.side_a_label.clone(),
            side_b_label: profile.side_b_label.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        field_summary,
        detail,
        missing,
        warnings,
        notes: normalization_notes(profile, &input.dictionaries),
    })
}

// ---------------------------------------------------------------------------
// Field plan
// ---------------------------------------------------------------------------

/// Where one mapping entry lives on each side and how its values compare.
struct FieldPlan<'m> {
    entry: &'m MappingEntry,
    col_a: Option<usize>,
    col_b: Option<usize>,
    source_column: Option<String>,
    kind: ValueKind,
}

impl<'m> FieldPlan<'m> {
    fn resolve(
        entry: &'m MappingEntry,
        mapping: &FieldMapping,
        a: &Table,
        b: &Table,
        normalizer: &Normalizer<'_>,
    ) -> Self {
        let col_a = mapping.source_column(a, &entry.source).map(|(i, _)| i);
        let source_column = col_a.map(|i| a.columns()[i].clone());
        let col_b = b.find_column(&entry.target);
        let kind = normalizer.kind_of(
            &entry.target,
            Some(source_column.as_deref().unwrap_or(&entry.source)),
        );
        Self {
            entry,
            col_a,
            col_b,
            source_column,
            kind,
        }
    }
}

fn presence_rule(status: Status, plan: &FieldPlan<'_>, profile: &AuditProfile) -> String {
    let a = &profile.side_a_label;
    let b = &profile.side_b_label;
    match status {
        Status::EmployeeMissingOnA => format!("Employee only in {b}"),
        Status::EmployeeMissingOnB => format!("Employee only in {a}"),
        Status::ColumnMissingOnA => format!("Column '{}' not found in {a}", plan.entry.source),
        Status::ColumnMissingOnB => format!("Field '{}' not found in {b}", plan.entry.target),
        _ => String::new(),
    }
}

fn with_unit_note(
    rule: String,
    kind: ValueKind,
    a: &NormalizedValue,
    b: &NormalizedValue,
    profile: &AuditProfile,
) -> String {
    if kind != ValueKind::Amount {
        return rule;
    }
    let mut notes = Vec::new();
    if profile.side_a.units == Units::Cents && !a.blank {
        notes.push(format!("{} cents to dollars (/100)", profile.side_a_label));
    }
    if profile.side_b.units == Units::Cents && !b.blank {
        notes.push(format!("{} cents to dollars (/100)", profile.side_b_label));
    }
    if notes.is_empty() {
        rule
    } else {
        format!("{rule}; {}", notes.join("; "))
    }
}

// ---------------------------------------------------------------------------
// Context columns
// ---------------------------------------------------------------------------

/// Optional per-employee context columns on one table.
#[derive(Debug, Clone, Copy, Default)]
struct ContextColumns {
    status: Option<usize>,
    state: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
}

impl ContextColumns {
    fn resolve(table: &Table, side: Side, bindings: &RoleBindings) -> Result<Self, AuditError> {
        Ok(Self {
            status: resolve_binding(table, side, &ColumnRole::status(), bindings.status.as_deref())?,
            state: resolve_binding(table, side, &ColumnRole::state(), bindings.state.as_deref())?,
            first_name: resolve_binding(table, side, &ColumnRole::first_name(), bindings.first_name.as_deref())?,
            last_name: resolve_binding(table, side, &ColumnRole::last_name(), bindings.last_name.as_deref())?,
        })
    }

    /// First non-blank value per employee for each context column.
    fn collect(&self, table: &Table, id_col: usize, transform: KeyTransform) -> HashMap<String, EmployeeContext> {
        let mut out: HashMap<String, EmployeeContext> = HashMap::new();
        for r in 0..table.len() {
            let id = transform.apply(clean_blank(table.cell(r, id_col)));
            if id.is_empty() {
                continue;
            }
            let ctx = out.entry(id).or_default();
            fill(&mut ctx.employment_status, table, r, self.status);
            fill(&mut ctx.state, table, r, self.state);
            fill(&mut ctx.first_name, table, r, self.first_name);
            fill(&mut ctx.last_name, table, r, self.last_name);
        }
        out
    }
}

fn fill(slot: &mut String, table: &Table, row: usize, col: Option<usize>) {
    if !slot.is_empty() {
        return;
    }
    if let Some(c) = col {
        *slot = clean_blank(table.cell(row, c)).to_string();
    }
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

fn normalization_notes(profile: &AuditProfile, dicts: &crate::dictionary::ReferenceDictionaries) -> Vec<String> {
    let a = &profile.side_a_label;
    let b = &profile.side_b_label;
    let mut notes = vec!["Compare only fields present in the mapping table.".to_string()];

    if profile.side_b.layout == Layout::Long {
        notes.push(format!(
            "{b} long format is pivoted wide by (employee id, field key); the last non-blank value per key wins."
        ));
    }

    let dict_note = match &dicts.filing_status {
        Some(d) if !d.is_empty() => "translated through the filing status dictionary",
        _ => "compared as raw codes (no filing status dictionary)",
    };
    for (side, label) in [(Side::A, a), (Side::B, b)] {
        if profile.side(side).filing_status_codes {
            notes.push(format!(
                "Filing Status: {label} codes {dict_note}; compare case/punct-insensitive; substring match allowed."
            ));
        }
    }

    notes.push("Boolean: Yes/Y/True/T/1/On = Yes; No/N/False/F/0/Off = No; anything else counts as blank.".into());

    let unit = |u: Units| match u {
        Units::Dollars => "dollars",
        Units::Cents => "cents",
    };
    notes.push(format!(
        "Amounts: {a} in {}, {b} in {}; converted to dollars and rounded to 2 decimals.",
        unit(profile.side_a.units),
        unit(profile.side_b.units)
    ));
    notes.push(
        "Numeric blanks count as 0 for equality; boolean and text blanks stay blank (both blank = match, one blank = missing value)."
            .into(),
    );
    if profile.side_a.key_transform != KeyTransform::Trim || profile.side_b.key_transform != KeyTransform::Trim {
        notes.push("Employee ids are canonicalized before joining (key transform).".into());
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SideConfig;
    use crate::dictionary::{FilingStatusCodes, ReferenceDictionaries};

    fn table(name: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn deduction_input() -> AuditInput {
        AuditInput {
            side_a: table(
                "adp",
                &["Associate ID", "Position Status", "Voluntary Deduction : Dental", "Vision"],
                &[&["100", "Active", "25.00", ""], &["200", "Terminated", "10", "5"]],
            ),
            side_b: table(
                "uzio",
                &["Employee ID", "DEN", "VIS"],
                &[&["100", "25", "0"], &["300", "1", ""]],
            ),
            mapping: table(
                "mapping",
                &["ADP Column", "Uzio Field Key"],
                &[&["Dental", "DEN"], &["Vision", "VIS"], &["Life", "LIFE"]],
            ),
            dictionaries: ReferenceDictionaries::default(),
        }
    }

    #[test]
    fn deduction_run_classifies_every_pair() {
        let result = run(&AuditProfile::deduction(), &deduction_input()).unwrap();
        let status_of = |id: &str, key: &str| {
            result
                .detail
                .iter()
                .find(|r| r.employee_id == id && r.field_key == key)
                .map(|r| r.status)
        };

        assert_eq!(result.detail.len(), 9);
        assert_eq!(status_of("100", "DEN"), Some(Status::Match));
        // blank vs 0 matches for amounts
        assert_eq!(status_of("100", "VIS"), Some(Status::Match));
        assert_eq!(status_of("100", "LIFE"), Some(Status::ColumnMissingOnA));
        assert_eq!(status_of("200", "DEN"), Some(Status::EmployeeMissingOnB));
        assert_eq!(status_of("300", "LIFE"), Some(Status::EmployeeMissingOnA));

        assert_eq!(result.summary.employees_in_both, 1);
        assert_eq!(result.summary.employees_only_a, 1);
        assert_eq!(result.summary.employees_only_b, 1);
        assert_eq!(result.summary.fields_compared, 3);

        // "Position Status" resolves as the status role; 100 is active
        assert_eq!(result.summary.active_mismatches, 1);
        assert!(result.detail.iter().filter(|r| r.employee_id == "300").all(|r| !r.is_active));

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::UnmappedColumn);
        assert_eq!(result.missing.len(), 2);
        assert_eq!(result.missing[0].context.employment_status, "Terminated");
    }

    #[test]
    fn detail_order_is_employee_then_mapping() {
        let result = run(&AuditProfile::deduction(), &deduction_input()).unwrap();
        let keys: Vec<(&str, &str)> = result
            .detail
            .iter()
            .map(|r| (r.employee_id.as_str(), r.field_key.as_str()))
            .collect();
        assert_eq!(&keys[..4], &[("100", "DEN"), ("100", "VIS"), ("100", "LIFE"), ("200", "DEN")]);
        assert_eq!(keys[8], ("300", "LIFE"));
    }

    #[test]
    fn source_column_records_the_prefixed_header() {
        let result = run(&AuditProfile::deduction(), &deduction_input()).unwrap();
        let row = &result.detail[0];
        assert_eq!(row.source_column.as_deref(), Some("Voluntary Deduction : Dental"));
        assert_eq!(result.detail[2].source_column, None);
    }

    #[test]
    fn missing_employee_id_column_fails_fast() {
        let mut input = deduction_input();
        input.side_a = table("adp", &["Name", "Dental"], &[&["x", "1"]]);
        let err = run(&AuditProfile::deduction(), &input).unwrap_err();
        match err {
            AuditError::SourceSchema { side, role, found, .. } => {
                assert_eq!(side, Side::A);
                assert_eq!(role, "employee_id");
                assert_eq!(found, vec!["Name".to_string(), "Dental".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mapping_schema_error_fails_fast() {
        let mut input = deduction_input();
        input.mapping = table("mapping", &["From", "To"], &[]);
        let err = run(&AuditProfile::deduction(), &input).unwrap_err();
        assert!(matches!(err, AuditError::MappingSchema { .. }));
    }

    fn withholding_input(codes: Option<FilingStatusCodes>) -> AuditInput {
        AuditInput {
            side_a: table(
                "paycom",
                &["Employee_Code", "Employee_Status", "State", "Filing Status", "Addl FIT"],
                &[&["100", "Active", "CA", "Single filer", "$25.00"]],
            ),
            side_b: table(
                "uzio",
                &["employee_id", "withholding_field_key", "withholding_field_value"],
                &[
                    &["100", "FIT_FILING_STATUS", "S"],
                    &["100", "FIT_ADDL_WITHHOLDING_PER_PAY_PERIOD", "2500"],
                ],
            ),
            mapping: table(
                "mapping",
                &["PayCom Column", "Uzio Field Key"],
                &[
                    &["Filing Status", "FIT_FILING_STATUS"],
                    &["Addl FIT", "FIT_ADDL_WITHHOLDING_PER_PAY_PERIOD"],
                ],
            ),
            dictionaries: ReferenceDictionaries {
                labels: None,
                filing_status: codes,
            },
        }
    }

    #[test]
    fn withholding_filing_status_and_cents() {
        let codes = FilingStatusCodes::from_pairs([("S", "Single")]);
        let result = run(&AuditProfile::withholding(), &withholding_input(Some(codes))).unwrap();
        assert_eq!(result.detail.len(), 2);
        assert!(result.detail.iter().all(|r| r.status == Status::Match));
        assert_eq!(result.detail[1].value_b_norm, "25.00");
        assert!(result.detail[1].rule.contains("Uzio cents to dollars"));
        assert!(result.warnings.is_empty());
        assert_eq!(result.detail[0].context.state, "CA");
    }

    #[test]
    fn unknown_filing_code_warns_and_mismatches() {
        let codes = FilingStatusCodes::from_pairs([("M", "Married")]);
        let result = run(&AuditProfile::withholding(), &withholding_input(Some(codes))).unwrap();
        assert_eq!(result.detail[0].status, Status::Mismatch);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::AmbiguousClassification);
        assert!(result.warnings[0].message.contains("'S'"));
    }

    #[test]
    fn configured_active_column_missing_means_all_active() {
        let mut profile = AuditProfile::deduction();
        profile.active.column = Some("Worker Status".into());
        let result = run(&profile, &deduction_input()).unwrap();
        assert!(result.detail.iter().all(|r| r.is_active));
    }

    #[test]
    fn long_ids_are_keyed_before_pivot() {
        let mut profile = AuditProfile::deduction();
        profile.side_b = SideConfig {
            layout: Layout::Long,
            units: Units::Cents,
            key_transform: KeyTransform::StripLeadingZeros,
            filing_status_codes: false,
            columns: RoleBindings {
                employee_id: Some("employee_id".into()),
                field_key: Some("field_key".into()),
                field_value: Some("field_value".into()),
                ..RoleBindings::default()
            },
        };
        let input = AuditInput {
            side_a: table("adp", &["Associate ID", "Dental"], &[&["7", "25.00"]]),
            side_b: table(
                "uzio",
                &["employee_id", "field_key", "field_value"],
                &[&["007", "DEN", "100"], &["7", "DEN", "2500"]],
            ),
            mapping: table("mapping", &["ADP Column", "Uzio Field Key"], &[&["Dental", "DEN"]]),
            dictionaries: ReferenceDictionaries::default(),
        };

        let result = run(&profile, &input).unwrap();
        assert_eq!(result.detail.len(), 1);
        let row = &result.detail[0];
        assert_eq!(row.employee_id, "7");
        assert_eq!(row.status, Status::Match);
        assert_eq!(row.value_b_norm, "25.00");
        assert!(!result.warnings.iter().any(|w| w.kind == WarningKind::DuplicateEmployee));
    }

    #[test]
    fn notes_describe_the_profile() {
        let result = run(&AuditProfile::withholding(), &withholding_input(None)).unwrap();
        assert!(result.notes.iter().any(|n| n.contains("pivoted wide")));
        assert!(result.notes.iter().any(|n| n.contains("raw codes")));
        assert!(result.notes.iter().any(|n| n.contains("Uzio in cents")));
    }
}
