//! `payrecon`: payroll/HR field reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables (two exports plus a field
//! mapping) and an [`AuditProfile`], returns a per-employee, per-field
//! classified comparison with summary projections. No file IO.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod header;
pub mod mapping;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod pivot;
pub mod table;

pub use config::AuditProfile;
pub use dictionary::{FieldLabels, FilingStatusCodes, ReferenceDictionaries};
pub use engine::run;
pub use error::AuditError;
pub use model::{AuditInput, AuditResult, ComparisonRow, Side, Status};
pub use table::Table;
