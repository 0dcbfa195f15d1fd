use std::fmt;

use crate::model::Side;

#[derive(Debug)]
pub enum AuditError {
    /// Byte content could not be parsed in its declared format.
    Load { file: String, message: String },
    /// Mapping table is missing one or both of its required columns.
    MappingSchema { missing: Vec<String>, found: Vec<String> },
    /// A source table has no column for a required role.
    SourceSchema {
        side: Side,
        role: String,
        column: Option<String>,
        found: Vec<String>,
    },
    /// TOML parse / deserialization error in an audit profile.
    ProfileParse(String),
    /// Profile validation error (missing long-format binding, bad mapping names, etc.).
    ProfileValidation(String),
    /// Reference dictionary could not be read.
    Dictionary { kind: &'static str, message: String },
    /// Report serialization failed.
    Export(String),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { file, message } => write!(f, "cannot load '{file}': {message}"),
            Self::MappingSchema { missing, found } => write!(
                f,
                "mapping table is missing required column(s) {}; found: {}",
                quote_list(missing),
                quote_list(found)
            ),
            Self::SourceSchema { side, role, column, found } => {
                match column {
                    Some(col) => write!(f, "{side}: {role} column '{col}' not found")?,
                    None => write!(f, "{side}: no column resolves to role '{role}'")?,
                }
                write!(f, "; found: {}", quote_list(found))
            }
            Self::ProfileParse(msg) => write!(f, "profile parse error: {msg}"),
            Self::ProfileValidation(msg) => write!(f, "profile validation error: {msg}"),
            Self::Dictionary { kind, message } => write!(f, "{kind} dictionary: {message}"),
            Self::Export(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for AuditError {}

fn quote_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".into();
    }
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
