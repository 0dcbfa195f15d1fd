//! File IO for `payrecon`: uploaded bytes to Tables, AuditResult to report files.

pub mod csv;
mod header_row;
pub mod report;
pub mod upload;
pub mod xlsx;

pub use upload::{load_table, run_upload, TableFormat, Upload, UploadRequest};
pub use xlsx::SheetSelector;
