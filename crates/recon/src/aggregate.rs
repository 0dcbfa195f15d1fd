use std::collections::{BTreeMap, HashMap, HashSet};

use crate::matcher::EmployeeJoin;
use crate::model::{
    AuditSummary, ComparisonRow, EmployeeContext, FieldSummaryRow, MissingEmployee, Side, Status,
    StatusCount,
};

/// Run-level counts over the join and the classified rows.
pub fn compute_summary(join: &EmployeeJoin, detail: &[ComparisonRow], fields_compared: usize) -> AuditSummary {
    let mut status_counts: BTreeMap<String, usize> =
        Status::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();

    let mut total_mismatches = 0;
    let mut active_mismatches = 0;
    let mut with_mismatch: HashSet<&str> = HashSet::new();
    let mut active_with_mismatch: HashSet<&str> = HashSet::new();

    for row in detail {
        *status_counts.entry(row.status.as_str().to_string()).or_insert(0) += 1;
        if row.status.is_mismatch() {
            total_mismatches += 1;
            with_mismatch.insert(&row.employee_id);
            if row.is_active {
                active_mismatches += 1;
                active_with_mismatch.insert(&row.employee_id);
            }
        }
    }

    AuditSummary {
        employees_a: join.in_both.len() + join.only_a.len(),
        employees_b: join.in_both.len() + join.only_b.len(),
        employees_in_both: join.in_both.len(),
        employees_only_a: join.only_a.len(),
        employees_only_b: join.only_b.len(),
        employees_total: join.union_len(),
        fields_compared,
        total_comparisons: detail.len(),
        total_mismatches,
        active_mismatches,
        employees_with_mismatch: with_mismatch.len(),
        active_employees_with_mismatch: active_with_mismatch.len(),
        status_counts,
    }
}

/// Field x status cross-tab. Rows follow `fields` (deduplicated by key);
/// every status column is present, zero-filled.
pub fn field_summary(fields: &[(String, String)], detail: &[ComparisonRow]) -> Vec<FieldSummaryRow> {
    let mut counts: HashMap<&str, [usize; 8]> = HashMap::new();
    for row in detail {
        counts.entry(row.field_key.as_str()).or_insert([0; 8])[row.status.index()] += 1;
    }

    let mut seen = HashSet::new();
    fields
        .iter()
        .filter(|(key, _)| seen.insert(key.as_str()))
        .map(|(key, label)| {
            let c = counts.get(key.as_str()).copied().unwrap_or([0; 8]);
            FieldSummaryRow {
                field_key: key.clone(),
                field_label: label.clone(),
                counts: Status::ALL
                    .iter()
                    .map(|s| StatusCount {
                        status: *s,
                        count: c[s.index()],
                    })
                    .collect(),
                total: c.iter().sum(),
            }
        })
        .collect()
}

/// Employees present on one side only: side-A-only first, then side-B-only.
pub fn missing_roster(
    join: &EmployeeJoin,
    context_a: &HashMap<String, EmployeeContext>,
    context_b: &HashMap<String, EmployeeContext>,
) -> Vec<MissingEmployee> {
    let entry = |id: &String, missing_on: Side, ctx: &HashMap<String, EmployeeContext>| MissingEmployee {
        employee_id: id.clone(),
        missing_on,
        context: ctx.get(id).cloned().unwrap_or_default(),
    };

    join.only_a
        .iter()
        .map(|id| entry(id, Side::B, context_a))
        .chain(join.only_b.iter().map(|id| entry(id, Side::A, context_b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, key: &str, status: Status, active: bool) -> ComparisonRow {
        ComparisonRow {
            employee_id: id.into(),
            field_key: key.into(),
            field_label: key.into(),
            source_column: Some(key.into()),
            value_a_raw: String::new(),
            value_b_raw: String::new(),
            value_a_norm: String::new(),
            value_b_norm: String::new(),
            status,
            rule: String::new(),
            is_active: active,
            context: EmployeeContext::default(),
        }
    }

    fn join() -> EmployeeJoin {
        EmployeeJoin {
            order: vec!["1".into(), "2".into(), "3".into()],
            in_both: vec!["1".into()],
            only_a: vec!["2".into()],
            only_b: vec!["3".into()],
        }
    }

    #[test]
    fn summary_counts_mismatch_classes() {
        let detail = vec![
            row("1", "DEN", Status::Match, true),
            row("1", "VIS", Status::Mismatch, true),
            row("2", "DEN", Status::EmployeeMissingOnB, false),
            row("2", "VIS", Status::EmployeeMissingOnB, false),
            row("3", "DEN", Status::EmployeeMissingOnA, false),
            row("3", "VIS", Status::EmployeeMissingOnA, false),
        ];
        let s = compute_summary(&join(), &detail, 2);
        assert_eq!(s.employees_a, 2);
        assert_eq!(s.employees_b, 2);
        assert_eq!(s.employees_in_both, 1);
        assert_eq!(s.employees_total, 3);
        assert_eq!(s.total_comparisons, 6);
        assert_eq!(s.total_mismatches, 5);
        assert_eq!(s.active_mismatches, 1);
        assert_eq!(s.employees_with_mismatch, 3);
        assert_eq!(s.active_employees_with_mismatch, 1);
        assert_eq!(s.status_counts.len(), Status::ALL.len());
        assert_eq!(s.status_counts["column_missing_on_a"], 0);
        assert_eq!(s.status_counts["employee_missing_on_b"], 2);
    }

    #[test]
    fn field_summary_zero_fills_and_orders_by_fields() {
        let detail = vec![
            row("1", "VIS", Status::Mismatch, true),
            row("1", "DEN", Status::Match, true),
            row("2", "DEN", Status::ValueMissingOnA, true),
        ];
        let fields = vec![
            ("DEN".to_string(), "Dental".to_string()),
            ("VIS".to_string(), "Vision".to_string()),
            ("DEN".to_string(), "Dental".to_string()),
            ("LIFE".to_string(), "Life".to_string()),
        ];
        let fs = field_summary(&fields, &detail);
        assert_eq!(fs.len(), 3);
        assert_eq!(fs[0].field_key, "DEN");
        assert_eq!(fs[0].counts.len(), 8);
        assert_eq!(fs[0].count(Status::Match), 1);
        assert_eq!(fs[0].count(Status::ValueMissingOnA), 1);
        assert_eq!(fs[0].total, 2);
        assert_eq!(fs[1].count(Status::Mismatch), 1);
        assert_eq!(fs[2].total, 0);
        assert_eq!(fs[2].counts[0].status, Status::Match);
    }

    #[test]
    fn roster_lists_each_side() {
        let mut ctx_a = HashMap::new();
        ctx_a.insert(
            "2".to_string(),
            EmployeeContext {
                employment_status: "Active".into(),
                state: "CA".into(),
                first_name: "Ana".into(),
                last_name: "Diaz".into(),
            },
        );
        let roster = missing_roster(&join(), &ctx_a, &HashMap::new());
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].employee_id, "2");
        assert_eq!(roster[0].missing_on, Side::B);
        assert_eq!(roster[0].context.state, "CA");
        assert_eq!(roster[1].employee_id, "3");
        assert_eq!(roster[1].missing_on, Side::A);
        assert_eq!(roster[1].context, EmployeeContext::default());
    }
}
