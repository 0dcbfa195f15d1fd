//! Reference dictionaries: field-key labels and filing-status code labels.
//!
//! Both are optional. A missing dictionary or a missing entry falls back to
//! the raw key or code.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde_yaml::Value;

use crate::error::AuditError;

/// Label group consulted after the employee's own state.
pub const FEDERAL_GROUP: &str = "FED";

// ---------------------------------------------------------------------------
// Field labels
// ---------------------------------------------------------------------------

/// Field-key labels grouped by state (or `FED`), in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLabels {
    groups: Vec<(String, HashMap<String, String>)>,
}

impl FieldLabels {
    /// Parse a key-mapping YAML document.
    ///
    /// Accepts `withholding_es.mappings.<GROUP>.<KEY>` or a bare
    /// `<GROUP>.<KEY>` mapping. An entry is either a string or a map with a
    /// `label`. Entries of any other shape are skipped.
    pub fn from_yaml_str(input: &str) -> Result<Self, AuditError> {
        let doc: Value = serde_yaml::from_str(input).map_err(|e| AuditError::Dictionary {
            kind: "field labels",
            message: e.to_string(),
        })?;

        let root = doc
            .get("withholding_es")
            .and_then(|v| v.get("mappings"))
            .unwrap_or(&doc);

        let mut labels = Self::default();
        let Value::Mapping(groups) = root else {
            if !root.is_null() {
                return Err(AuditError::Dictionary {
                    kind: "field labels",
                    message: "expected a mapping of groups to field labels".into(),
                });
            }
            return Ok(labels);
        };

        for (group, entries) in groups {
            let (Some(group), Value::Mapping(entries)) = (group.as_str(), entries) else {
                continue;
            };
            let mut map = HashMap::new();
            for (key, entry) in entries {
                let Some(key) = key.as_str() else { continue };
                let label = match entry {
                    Value::String(s) => Some(s.clone()),
                    Value::Mapping(_) => entry.get("label").and_then(scalar_string),
                    _ => None,
                };
                if let Some(label) = label {
                    map.insert(key.trim().to_string(), label.trim().to_string());
                }
            }
            labels.groups.push((group.trim().to_uppercase(), map));
        }

        log::debug!(
            "field labels: {} group(s), {} label(s)",
            labels.groups.len(),
            labels.groups.iter().map(|(_, m)| m.len()).sum::<usize>()
        );
        Ok(labels)
    }

    pub fn from_groups<'a>(groups: impl IntoIterator<Item = (&'a str, Vec<(&'a str, &'a str)>)>) -> Self {
        Self {
            groups: groups
                .into_iter()
                .map(|(g, entries)| {
                    let map = entries
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    (g.to_uppercase(), map)
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, m)| m.is_empty())
    }

    /// Employee's state group, then `FED`, then any group in document order.
    pub fn label_for(&self, field_key: &str, state: &str) -> Option<&str> {
        let key = field_key.trim();
        let state = state.trim().to_uppercase();

        let in_group = |name: &str| {
            self.groups
                .iter()
                .filter(|(g, _)| g == name)
                .find_map(|(_, m)| m.get(key))
        };

        if !state.is_empty() {
            if let Some(label) = in_group(&state) {
                return Some(label);
            }
        }
        if let Some(label) = in_group(FEDERAL_GROUP) {
            return Some(label);
        }
        self.groups.iter().find_map(|(_, m)| m.get(key)).map(String::as_str)
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Filing-status codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilingStatusCodes {
    codes: BTreeMap<String, String>,
}

impl FilingStatusCodes {
    /// Parse `CODE("Label")` entries; any number per line, other text ignored.
    pub fn from_text(input: &str) -> Result<Self, AuditError> {
        let pattern = Regex::new(r#"([A-Z0-9_]+)\("([^"]+)"\)"#).map_err(|e| AuditError::Dictionary {
            kind: "filing status codes",
            message: e.to_string(),
        })?;

        let mut codes = BTreeMap::new();
        for cap in pattern.captures_iter(input) {
            codes.insert(cap[1].trim().to_string(), cap[2].trim().to_string());
        }

        if codes.is_empty() && !input.trim().is_empty() {
            log::warn!("filing status codes: no CODE(\"Label\") entries found");
        }
        log::debug!("filing status codes: {} code(s)", codes.len());
        Ok(Self { codes })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            codes: pairs
                .into_iter()
                .map(|(c, l)| (c.to_string(), l.to_string()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Exact code first, then the uppercased code.
    pub fn translate(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        self.codes
            .get(code)
            .or_else(|| self.codes.get(&code.to_uppercase()))
            .map(String::as_str)
    }
}

/// Both optional dictionaries for one run. Read-only during comparison.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDictionaries {
    pub labels: Option<FieldLabels>,
    pub filing_status: Option<FilingStatusCodes>,
}

impl ReferenceDictionaries {
    /// Display label for a field, falling back to the raw key.
    pub fn field_label(&self, field_key: &str, state: &str) -> String {
        self.labels
            .as_ref()
            .and_then(|l| l.label_for(field_key, state))
            .unwrap_or(field_key)
            .to_string()
    }
}
