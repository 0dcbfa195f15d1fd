//! CLI exit code registry.
//!
//! Scripts rely on these values; they are part of the shell contract.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | Mismatches found (only with `--strict-exit`)         |
//! | 2    | Usage error (bad args, unknown profile)              |
//! | 3    | Filesystem error reading inputs or writing outputs   |
//! | 60   | Invalid audit profile (parse or validation)          |
//! | 61   | Input could not be loaded (bad bytes, bad dictionary)|
//! | 62   | Schema error (mapping or source column missing)      |
//! | 63   | Report could not be written                          |

use payrecon::AuditError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Audit completed and found at least one non-match row.
/// Like `diff(1)`, exit 1 means "inputs differ". Opt-in via `--strict-exit`.
pub const EXIT_MISMATCHES: u8 = 1;

/// Usage error - bad arguments, unknown profile name.
pub const EXIT_USAGE: u8 = 2;

/// An input could not be read or an output file could not be created.
pub const EXIT_IO: u8 = 3;

pub const EXIT_INVALID_PROFILE: u8 = 60;

pub const EXIT_LOAD: u8 = 61;

/// Mapping table or a source table lacks a required column. Nothing was compared.
pub const EXIT_SCHEMA: u8 = 62;

pub const EXIT_EXPORT: u8 = 63;

/// Map an engine error to its exit code.
pub fn audit_exit_code(err: &AuditError) -> u8 {
    match err {
        AuditError::ProfileParse(_) | AuditError::ProfileValidation(_) => EXIT_INVALID_PROFILE,
        AuditError::Load { .. } | AuditError::Dictionary { .. } => EXIT_LOAD,
        AuditError::MappingSchema { .. } | AuditError::SourceSchema { .. } => EXIT_SCHEMA,
        AuditError::Export(_) => EXIT_EXPORT,
    }
}
