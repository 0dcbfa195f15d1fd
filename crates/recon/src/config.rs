use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::mapping::DEFAULT_HEADER_PREFIXES;
use crate::model::Side;
use crate::normalize::{default_rules, KindRule, ValueKind};

/// Status values that mark an employee active when no list is configured.
pub const DEFAULT_ACTIVE_VALUES: &[&str] = &["Active", "A", "1", "True", "Yes"];

// ---------------------------------------------------------------------------
// Top-level profile
// ---------------------------------------------------------------------------

/// One audit variant: role bindings, inference rules and labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditProfile {
    pub name: String,
    #[serde(default = "default_side_a_label")]
    pub side_a_label: String,
    #[serde(default = "default_side_b_label")]
    pub side_b_label: String,
    #[serde(default)]
    pub default_kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub side_a: SideConfig,
    #[serde(default)]
    pub side_b: SideConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub active: ActiveConfig,
    #[serde(default)]
    pub rules: Vec<KindRule>,
    #[serde(default)]
    pub fields: BTreeMap<String, ValueKind>,
}

fn default_side_a_label() -> String {
    "Side A".into()
}

fn default_side_b_label() -> String {
    "Side B".into()
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideConfig {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub key_transform: KeyTransform,
    /// Filing-status cells on this side are dictionary codes.
    #[serde(default)]
    pub filing_status_codes: bool,
    #[serde(default)]
    pub columns: RoleBindings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Wide,
    Long,
}

/// Minor-unit reporting for amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Dollars,
    Cents,
}

/// Employee id canonicalization applied to both sides before joining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTransform {
    #[default]
    Trim,
    /// Keep digits only.
    Digits,
    /// `000123` and `123` are the same employee.
    StripLeadingZeros,
}

impl KeyTransform {
    pub fn apply(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            Self::Trim => trimmed.to_string(),
            Self::Digits => trimmed.chars().filter(|c| c.is_ascii_digit()).collect(),
            Self::StripLeadingZeros => {
                let stripped = trimmed.trim_start_matches('0');
                if stripped.is_empty() && !trimmed.is_empty() {
                    "0".into()
                } else {
                    stripped.to_string()
                }
            }
        }
    }
}

/// Explicit column names per role. Unset roles are resolved from headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_value: Option<String>,
}

// ---------------------------------------------------------------------------
// Mapping + Active
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Header of the side-A field name column.
    #[serde(default = "default_source_column")]
    pub source_column: String,
    /// Header of the side-B field key column.
    #[serde(default = "default_target_column")]
    pub target_column: String,
}

fn default_source_column() -> String {
    "Source Column".into()
}

fn default_target_column() -> String {
    "Target Field Key".into()
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            source_column: default_source_column(),
            target_column: default_target_column(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveConfig {
    /// Side-A status column. When unset the status role resolver is tried;
    /// when nothing resolves every employee counts as active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default = "default_active_values")]
    pub values: Vec<String>,
}

fn default_active_values() -> Vec<String> {
    DEFAULT_ACTIVE_VALUES.iter().map(|v| v.to_string()).collect()
}

impl Default for ActiveConfig {
    fn default() -> Self {
        Self {
            column: None,
            values: default_active_values(),
        }
    }
}

impl ActiveConfig {
    pub fn is_active_value(&self, value: &str) -> bool {
        let value = value.trim();
        self.values.iter().any(|v| v.trim().eq_ignore_ascii_case(value))
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

impl AuditProfile {
    /// Names accepted by [`AuditProfile::builtin`].
    pub const BUILTINS: &'static [&'static str] = &["withholding", "deduction"];

    /// Wide payroll export against a long HR withholding export in cents.
    pub fn withholding() -> Self {
        Self {
            name: "withholding".into(),
            side_a_label: "Paycom".into(),
            side_b_label: "Uzio".into(),
            default_kind: ValueKind::String,
            header_prefixes: None,
            side_a: SideConfig::default(),
            side_b: SideConfig {
                layout: Layout::Long,
                units: Units::Cents,
                key_transform: KeyTransform::Trim,
                filing_status_codes: true,
                columns: RoleBindings {
                    employee_id: Some("employee_id".into()),
                    field_key: Some("withholding_field_key".into()),
                    field_value: Some("withholding_field_value".into()),
                    ..RoleBindings::default()
                },
            },
            mapping: MappingConfig {
                source_column: "PayCom Column".into(),
                target_column: "Uzio Field Key".into(),
            },
            active: ActiveConfig::default(),
            rules: default_rules(),
            fields: BTreeMap::new(),
        }
    }

    /// Two wide deduction exports; every mapped field is an amount.
    pub fn deduction() -> Self {
        Self {
            name: "deduction".into(),
            side_a_label: "ADP".into(),
            side_b_label: "Uzio".into(),
            default_kind: ValueKind::Amount,
            header_prefixes: None,
            side_a: SideConfig::default(),
            side_b: SideConfig::default(),
            mapping: MappingConfig {
                source_column: "ADP Column".into(),
                target_column: "Uzio Field Key".into(),
            },
            active: ActiveConfig::default(),
            rules: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "withholding" => Some(Self::withholding()),
            "deduction" => Some(Self::deduction()),
            _ => None,
        }
    }

    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    pub fn side_label(&self, side: Side) -> &str {
        match side {
            Side::A => &self.side_a_label,
            Side::B => &self.side_b_label,
        }
    }

    pub fn header_prefixes(&self) -> Vec<String> {
        match &self.header_prefixes {
            Some(p) => p.clone(),
            None => DEFAULT_HEADER_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AuditProfile {
    pub fn from_toml(input: &str) -> Result<Self, AuditError> {
        let profile: AuditProfile =
            toml::from_str(input).map_err(|e| AuditError::ProfileParse(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_toml(&self) -> Result<String, AuditError> {
        toml::to_string_pretty(self).map_err(|e| AuditError::ProfileParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        if self.name.trim().is_empty() {
            return Err(AuditError::ProfileValidation("name must not be empty".into()));
        }

        if self.side_a_label.trim().is_empty() || self.side_b_label.trim().is_empty() {
            return Err(AuditError::ProfileValidation(
                "side labels must not be empty".into(),
            ));
        }

        // Side A is the wide system of record
        if self.side_a.layout == Layout::Long {
            return Err(AuditError::ProfileValidation(
                "side_a must be wide; only side_b may be long".into(),
            ));
        }

        if self.side_b.layout == Layout::Long {
            let cols = &self.side_b.columns;
            let mut missing = Vec::new();
            if is_unset(&cols.field_key) {
                missing.push("field_key");
            }
            if is_unset(&cols.field_value) {
                missing.push("field_value");
            }
            if !missing.is_empty() {
                return Err(AuditError::ProfileValidation(format!(
                    "side_b is long: side_b.columns must bind {}",
                    missing.join(" and ")
                )));
            }
        }

        let src = self.mapping.source_column.trim();
        let tgt = self.mapping.target_column.trim();
        if src.is_empty() || tgt.is_empty() {
            return Err(AuditError::ProfileValidation(
                "mapping.source_column and mapping.target_column must not be empty".into(),
            ));
        }
        if src.eq_ignore_ascii_case(tgt) {
            return Err(AuditError::ProfileValidation(format!(
                "mapping.source_column and mapping.target_column are both '{src}'"
            )));
        }

        if self.active.column.is_some() && self.active.values.iter().all(|v| v.trim().is_empty()) {
            return Err(AuditError::ProfileValidation(
                "active.values must list at least one value when active.column is set".into(),
            ));
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if rule.equals.is_empty() && rule.contains.is_empty() && rule.column_contains.is_empty() {
                return Err(AuditError::ProfileValidation(format!(
                    "rules[{i}] ({}) has no equals, contains or column_contains",
                    rule.kind.label()
                )));
            }
        }

        Ok(())
    }
}

fn is_unset(v: &Option<String>) -> bool {
    v.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
