// Property-based tests for pivoting and classification.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, BTreeSet, HashSet};

use payrecon::config::Units;
use payrecon::normalize::{filing_status_equivalent, normalize_amount};
use payrecon::pivot::pivot_long_to_wide;
use payrecon::{run, AuditInput, AuditProfile, ReferenceDictionaries, Status, Table};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Cell value: mostly amounts, sometimes text, sometimes blank.
fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"-?[0-9]{1,5}(\.[0-9]{1,2})?",
        1 => r"\$[0-9]{1,3},[0-9]{3}\.[0-9]{2}",
        1 => r"[a-zA-Z ]{1,10}",
        1 => Just(String::new()),
    ]
}

/// Distinct (id, key) pairs with one value each.
fn arb_unique_long() -> impl Strategy<Value = BTreeMap<(String, String), String>> {
    proptest::collection::btree_map(
        (r"[0-9]{1,3}", r"K[A-Z]{1,3}"),
        r"v[a-z0-9]{0,5}",
        0..40,
    )
}

/// Two wide tables over overlapping id sets plus a mapping naming some absent columns.
fn arb_wide_pair() -> impl Strategy<Value = (Table, Table, Table)> {
    let ids = proptest::collection::btree_set(r"[0-9]{1,3}", 0..12);
    let fields = proptest::collection::btree_set(r"F[A-Z]{1,2}", 1..5);
    (ids.clone(), ids, fields).prop_flat_map(|(ids_a, ids_b, fields)| {
        let fields: Vec<String> = fields.into_iter().collect();
        let ids_a: Vec<String> = ids_a.into_iter().collect();
        let ids_b: Vec<String> = ids_b.into_iter().collect();
        let values_a = proptest::collection::vec(arb_value(), ids_a.len() * fields.len());
        let values_b = proptest::collection::vec(arb_value(), ids_b.len() * fields.len());
        let drop_a = proptest::collection::vec(prop::bool::weighted(0.2), fields.len());
        let drop_b = proptest::collection::vec(prop::bool::weighted(0.2), fields.len());
        (
            Just(fields),
            Just(ids_a),
            Just(ids_b),
            values_a,
            values_b,
            drop_a,
            drop_b,
        )
            .prop_map(|(fields, ids_a, ids_b, va, vb, drop_a, drop_b)| {
                let a = wide("a", &ids_a, &fields, &va, &drop_a);
                let b = wide("b", &ids_b, &fields, &vb, &drop_b);
                let mapping = Table::from_rows(
                    "mapping",
                    vec!["Source Column".into(), "Target Field Key".into()],
                    fields.iter().map(|f| vec![f.clone(), f.clone()]).collect(),
                );
                (a, b, mapping)
            })
    })
}

fn wide(name: &str, ids: &[String], fields: &[String], values: &[String], drop: &[bool]) -> Table {
    let mut headers = vec!["Employee ID".to_string()];
    let kept: Vec<usize> = (0..fields.len()).filter(|&f| !drop[f]).collect();
    headers.extend(kept.iter().map(|&f| fields[f].clone()));
    let rows = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut row = vec![id.clone()];
            row.extend(kept.iter().map(|&f| values[i * fields.len() + f].clone()));
            row
        })
        .collect();
    Table::from_rows(name, headers, rows)
}

fn amount_profile() -> AuditProfile {
    AuditProfile::from_toml("name = \"prop\"\ndefault_kind = \"amount\"\n").unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// Pivoting unique (id, key) rows reproduces exactly those cells.
    #[test]
    fn pivot_of_unique_rows_is_lossless(cells in arb_unique_long()) {
        let long = Table::from_rows(
            "long",
            vec!["id".into(), "key".into(), "value".into()],
            cells.iter().map(|((i, k), v)| vec![i.clone(), k.clone(), v.clone()]).collect(),
        );
        let wide = pivot_long_to_wide(&long, 0, 1, 2);

        let ids: BTreeSet<&String> = cells.keys().map(|(i, _)| i).collect();
        let keys: BTreeSet<&String> = cells.keys().map(|(_, k)| k).collect();
        prop_assert_eq!(wide.len(), ids.len());
        prop_assert_eq!(wide.width(), keys.len() + 1);

        for (r, row) in wide.rows().iter().enumerate() {
            for (c, key) in wide.columns().iter().enumerate().skip(1) {
                let expected = cells.get(&(row[0].clone(), key.clone())).map(String::as_str).unwrap_or("");
                prop_assert_eq!(wide.cell(r, c), expected);
            }
        }
    }

    /// Exactly one status per row, consistent with the normalized values.
    #[test]
    fn status_partition((a, b, mapping) in arb_wide_pair()) {
        let input = AuditInput { side_a: a, side_b: b, mapping, dictionaries: ReferenceDictionaries::default() };
        let result = run(&amount_profile(), &input).unwrap();

        for row in &result.detail {
            match row.status {
                Status::Match => prop_assert!(
                    row.value_a_norm == row.value_b_norm
                        || filing_status_equivalent(&row.value_a_norm, &row.value_b_norm)
                ),
                Status::Mismatch => {
                    prop_assert!(!row.value_a_raw.is_empty() && !row.value_b_raw.is_empty());
                    prop_assert_ne!(&row.value_a_norm, &row.value_b_norm);
                }
                Status::ValueMissingOnA => prop_assert!(row.value_a_raw.is_empty() && !row.value_b_raw.is_empty()),
                Status::ValueMissingOnB => prop_assert!(!row.value_a_raw.is_empty() && row.value_b_raw.is_empty()),
                _ => {}
            }
        }
        let total: usize = result.summary.status_counts.values().sum();
        prop_assert_eq!(total, result.detail.len());
    }

    /// Every employee on either side has a row for every mapped field.
    #[test]
    fn every_employee_is_covered((a, b, mapping) in arb_wide_pair()) {
        let input = AuditInput { side_a: a, side_b: b, mapping, dictionaries: ReferenceDictionaries::default() };
        let result = run(&amount_profile(), &input).unwrap();

        let ids: HashSet<&str> = result.detail.iter().map(|r| r.employee_id.as_str()).collect();
        prop_assert_eq!(ids.len(), result.summary.employees_total);
        prop_assert_eq!(
            result.detail.len(),
            result.summary.employees_total * result.summary.fields_compared
        );
        prop_assert_eq!(
            result.missing.len(),
            result.summary.employees_only_a + result.summary.employees_only_b
        );
    }

    /// Same inputs, same detail and counts.
    #[test]
    fn runs_are_deterministic((a, b, mapping) in arb_wide_pair()) {
        let input = AuditInput { side_a: a, side_b: b, mapping, dictionaries: ReferenceDictionaries::default() };
        let first = run(&amount_profile(), &input).unwrap();
        let second = run(&amount_profile(), &input).unwrap();
        prop_assert_eq!(first.detail, second.detail);
        prop_assert_eq!(first.summary, second.summary);
    }

    /// Formatting noise never changes a parsed amount.
    #[test]
    fn amount_formatting_is_transparent(whole in 0u32..1_000_000, cents in 0u32..100) {
        let plain = format!("{whole}.{cents:02}");
        let pretty = format!("${}.{cents:02}", group_thousands(whole));
        prop_assert_eq!(normalize_amount(&plain, Units::Dollars), normalize_amount(&pretty, Units::Dollars));
        let negative = format!("({plain})");
        prop_assert_eq!(
            normalize_amount(&negative, Units::Dollars),
            normalize_amount(&format!("-{plain}"), Units::Dollars)
        );
    }
}

fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
