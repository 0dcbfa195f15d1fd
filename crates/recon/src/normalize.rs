//! Value Normalizer: key-driven type inference plus per-kind canonical forms.
//!
//! Every normalizer is total. A blank cell normalizes to the empty string;
//! an unparseable value normalizes to its trimmed original so it still shows
//! up in the report as a conflict.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::{AuditProfile, Units};
use crate::dictionary::FilingStatusCodes;
use crate::table::clean_blank;

// ---------------------------------------------------------------------------
// Kinds + inference rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Amount,
    Integer,
    FilingStatus,
    #[default]
    String,
}

impl ValueKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Amount => "Amount",
            Self::Integer => "Integer",
            Self::FilingStatus => "Filing Status",
            Self::String => "String",
        }
    }

    /// Value a blank cell takes for equality purposes. Only numeric kinds default.
    pub fn blank_default(&self) -> Option<&'static str> {
        match self {
            Self::Amount => Some("0.00"),
            Self::Integer => Some("0"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One type-inference rule. Matches when the field key equals any of
/// `equals`, contains any of `contains`, or the side-A source column name
/// contains any of `column_contains`. All comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRule {
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_contains: Vec<String>,
}

impl KindRule {
    pub fn matches(&self, field_key: &str, source_column: Option<&str>) -> bool {
        let key = field_key.trim().to_uppercase();
        if self.equals.iter().any(|e| e.to_uppercase() == key) {
            return true;
        }
        if self.contains.iter().any(|c| key.contains(&c.to_uppercase())) {
            return true;
        }
        match source_column {
            Some(col) => {
                let col = col.to_uppercase();
                self.column_contains.iter().any(|c| col.contains(&c.to_uppercase()))
            }
            None => false,
        }
    }

    fn new(kind: ValueKind, equals: &[&str], contains: &[&str], column_contains: &[&str]) -> Self {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            kind,
            equals: owned(equals),
            contains: owned(contains),
            column_contains: owned(column_contains),
        }
    }
}

/// The withholding vocabulary. Order matters: `EXEMPTION` hits the boolean
/// `EXEMPT` rule before the integer rule.
pub fn default_rules() -> Vec<KindRule> {
    vec![
        KindRule::new(
            ValueKind::FilingStatus,
            &["FIT_FILING_STATUS", "SIT_FILING_STATUS"],
            &[],
            &[],
        ),
        KindRule::new(
            ValueKind::Amount,
            &[],
            &["OTHER_INCOME", "ADDL", "WITHHOLDING", "CREDIT", "DEDUCTION", "OVERRIDE", "AMOUNT"],
            &["$"],
        ),
        KindRule::new(
            ValueKind::Boolean,
            &[],
            &["EXEMPT", "FLAG", "HIGHER", "NON_RESIDENT", "RESIDENT", "CERTIFICATE", "MULTIPLE_JOBS"],
            &[],
        ),
        KindRule::new(
            ValueKind::Integer,
            &[],
            &["ALLOWANCE", "EXEMPTION", "NUMBER", "TOTAL", "COUNT"],
            &[],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Per-kind normalizers
// ---------------------------------------------------------------------------

const TRUE_TOKENS: &[&str] = &["yes", "y", "true", "1", "t", "on"];
const FALSE_TOKENS: &[&str] = &["no", "n", "false", "0", "f", "off"];

/// Parse a money-ish cell: `$`, `,`, `%` and whitespace are dropped and
/// accounting parentheses negate.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let mut s: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect();

    let mut negative = false;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }
    if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }
    if s.is_empty() {
        return None;
    }

    let d = Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()?;
    Some(if negative { -d } else { d })
}

fn fixed(value: Decimal, dp: u32) -> String {
    let mut v = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    if v.is_zero() {
        v = Decimal::ZERO;
    }
    v.rescale(dp);
    v.to_string()
}

/// Two-decimal canonical amount, optionally converting minor units.
pub fn normalize_amount(raw: &str, units: Units) -> String {
    let cleaned = clean_blank(raw);
    if cleaned.is_empty() {
        return String::new();
    }
    match parse_decimal(cleaned) {
        Some(d) => {
            let d = match units {
                Units::Dollars => d,
                Units::Cents => d / Decimal::ONE_HUNDRED,
            };
            fixed(d, 2)
        }
        None => cleaned.to_string(),
    }
}

pub fn normalize_integer(raw: &str) -> String {
    let cleaned = clean_blank(raw);
    if cleaned.is_empty() {
        return String::new();
    }
    match parse_decimal(cleaned) {
        Some(d) => fixed(d.trunc(), 0),
        None => cleaned.to_string(),
    }
}

/// `Yes`, `No`, or blank. Unrecognised tokens are unknown and fold to blank.
pub fn normalize_boolean(raw: &str) -> String {
    let lower = clean_blank(raw).to_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        "Yes".into()
    } else if FALSE_TOKENS.contains(&lower.as_str()) {
        "No".into()
    } else {
        String::new()
    }
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub fn norm_text(raw: &str) -> String {
    let lowered: String = clean_blank(raw)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Equality or containment either way, after [`norm_text`].
pub fn filing_status_equivalent(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// A normalized side of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedValue {
    /// No usable value: the raw cell was blank (after null-token cleaning),
    /// or a boolean token was not recognised.
    pub blank: bool,
    /// Canonical form; empty when `blank`. The raw cell is kept by the caller.
    pub value: String,
    /// Filing-status code that the dictionary could not translate.
    pub untranslated: bool,
}

/// Profile-bound normalizer. Holds the inference rules and the filing-status
/// dictionary for one run.
pub struct Normalizer<'a> {
    rules: &'a [KindRule],
    fields: &'a BTreeMap<String, ValueKind>,
    default_kind: ValueKind,
    filing: Option<&'a FilingStatusCodes>,
}

impl<'a> Normalizer<'a> {
    pub fn new(profile: &'a AuditProfile, filing: Option<&'a FilingStatusCodes>) -> Self {
        Self {
            rules: &profile.rules,
            fields: &profile.fields,
            default_kind: profile.default_kind,
            filing,
        }
    }

    /// Explicit field override, then the first matching rule, then the default kind.
    pub fn kind_of(&self, field_key: &str, source_column: Option<&str>) -> ValueKind {
        if let Some(kind) = self.fields.get(field_key.trim()) {
            return *kind;
        }
        self.rules
            .iter()
            .find(|r| r.matches(field_key, source_column))
            .map(|r| r.kind)
            .unwrap_or(self.default_kind)
    }

    /// Normalize one side's raw cell for a field of the given kind.
    ///
    /// `coded` marks a side whose filing-status values are dictionary codes.
    pub fn normalize_value(&self, kind: ValueKind, raw: &str, units: Units, coded: bool) -> NormalizedValue {
        let cleaned = clean_blank(raw);
        if cleaned.is_empty() {
            return NormalizedValue {
                blank: true,
                value: String::new(),
                untranslated: false,
            };
        }

        let mut untranslated = false;
        let value = match kind {
            ValueKind::Amount => normalize_amount(cleaned, units),
            ValueKind::Integer => normalize_integer(cleaned),
            ValueKind::Boolean => normalize_boolean(cleaned),
            ValueKind::String => norm_text(cleaned),
            ValueKind::FilingStatus => match self.filing.filter(|d| coded && !d.is_empty()) {
                Some(dict) => match dict.translate(cleaned) {
                    Some(label) => norm_text(label),
                    None => {
                        untranslated = true;
                        norm_text(cleaned)
                    }
                },
                None => norm_text(cleaned),
            },
        };

        // an unknown boolean token carries no value; it classifies like a blank cell
        NormalizedValue {
            blank: value.is_empty(),
            value,
            untranslated,
        }
    }

    /// Key-only contract: infer the kind from the key and normalize in major units.
    pub fn normalize(&self, field_key: &str, raw: &str) -> String {
        let kind = self.kind_of(field_key, None);
        self.normalize_value(kind, raw, Units::Dollars, false).value
    }
}

/// Normalize with the built-in withholding vocabulary and no dictionaries.
pub fn normalize(field_key: &str, raw: &str) -> String {
    static PROFILE: OnceLock<AuditProfile> = OnceLock::new();
    let profile = PROFILE.get_or_init(AuditProfile::withholding);
    Normalizer::new(profile, None).normalize(field_key, raw)
}
