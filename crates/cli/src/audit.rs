//! `payrecon run` and `payrecon profile` commands.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use payrecon::{AuditProfile, AuditResult, Status};
use payrecon_io::report;
use payrecon_io::{run_upload, SheetSelector, Upload, UploadRequest};

use crate::exit_codes::{audit_exit_code, EXIT_MISMATCHES};
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Side-A export (wide: one row per employee)
    #[arg(long, value_name = "FILE")]
    pub side_a: PathBuf,

    /// Side-B export (wide or long, per profile)
    #[arg(long, value_name = "FILE")]
    pub side_b: PathBuf,

    /// Field mapping table (side-A column -> side-B field key)
    #[arg(long, value_name = "FILE")]
    pub mapping: PathBuf,

    /// Built-in profile name (withholding, deduction) or path to a .toml profile
    #[arg(long, default_value = "withholding")]
    pub profile: String,

    /// Field-key to label YAML dictionary
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,

    /// Filing-status code dictionary, CODE("Label") entries
    #[arg(long, value_name = "FILE")]
    pub filing_status: Option<PathBuf>,

    /// Worksheet of the side-A workbook (default: sheet named like the side-A system, else first)
    #[arg(long)]
    pub side_a_sheet: Option<String>,

    #[arg(long)]
    pub side_b_sheet: Option<String>,

    /// Worksheet of the mapping workbook (default: sheet containing "mapping", else first)
    #[arg(long)]
    pub mapping_sheet: Option<String>,

    /// Column on side A whose value decides whether an employee is active
    #[arg(long)]
    pub active_column: Option<String>,

    /// Values that mean "active" (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub active_values: Option<Vec<String>>,

    /// Write the xlsx report here
    #[arg(long, short = 'o', value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Write the Detail table as CSV here
    #[arg(long, value_name = "FILE")]
    pub detail_csv: Option<PathBuf>,

    /// Print the full result as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Exit 1 when any comparison is not a match
    #[arg(long)]
    pub strict_exit: bool,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Parse and validate a profile without running
    #[command(after_help = "\
Examples:
  payrecon profile validate dental.audit.toml")]
    Validate {
        /// Path to the .toml profile
        path: PathBuf,
    },

    /// Print a built-in profile as TOML (a starting point for custom profiles)
    #[command(after_help = "\
Examples:
  payrecon profile show withholding > my.audit.toml")]
    Show {
        /// Built-in profile name
        name: String,
    },
}

fn audit_err(err: payrecon::AuditError) -> CliError {
    CliError {
        code: audit_exit_code(&err),
        message: err.to_string(),
        hint: None,
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Built-in name first, then a path to a TOML profile.
pub fn resolve_profile(name_or_path: &str) -> Result<AuditProfile, CliError> {
    if let Some(profile) = AuditProfile::builtin(name_or_path) {
        return Ok(profile);
    }
    let path = Path::new(name_or_path);
    if !path.exists() {
        return Err(CliError::args(format!("unknown profile '{name_or_path}'"))
            .with_hint(format!("built-in profiles: {}; or pass a path to a .toml profile", AuditProfile::BUILTINS.join(", "))));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    AuditProfile::from_toml(&text).map_err(audit_err)
}

fn sheet_selector(explicit: Option<&str>, keyword: &str) -> SheetSelector {
    match explicit {
        Some(name) => SheetSelector::Named(name.to_string()),
        None => SheetSelector::keywords([keyword]),
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut profile = resolve_profile(&args.profile)?;
    if let Some(column) = args.active_column {
        profile.active.column = Some(column);
    }
    if let Some(values) = args.active_values {
        profile.active.values = values.into_iter().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect();
    }
    profile.validate().map_err(audit_err)?;

    let side_a_bytes = read_input(&args.side_a)?;
    let side_b_bytes = read_input(&args.side_b)?;
    let mapping_bytes = read_input(&args.mapping)?;
    let labels_bytes = args.labels.as_deref().map(read_input).transpose()?;
    let codes_bytes = args.filing_status.as_deref().map(read_input).transpose()?;

    let side_a_name = file_name(&args.side_a);
    let side_b_name = file_name(&args.side_b);
    let mapping_name = file_name(&args.mapping);
    let labels_name = args.labels.as_deref().map(file_name).unwrap_or_default();
    let codes_name = args.filing_status.as_deref().map(file_name).unwrap_or_default();

    let side_a_keyword = profile.side_a_label.to_lowercase();
    let side_b_keyword = profile.side_b_label.to_lowercase();

    let request = UploadRequest {
        side_a: Upload::new(&side_a_name, &side_a_bytes)
            .with_sheet(sheet_selector(args.side_a_sheet.as_deref(), &side_a_keyword)),
        side_b: Upload::new(&side_b_name, &side_b_bytes)
            .with_sheet(sheet_selector(args.side_b_sheet.as_deref(), &side_b_keyword)),
        mapping: Upload::new(&mapping_name, &mapping_bytes)
            .with_sheet(sheet_selector(args.mapping_sheet.as_deref(), "mapping")),
        labels: labels_bytes.as_deref().map(|b| Upload::new(&labels_name, b)),
        filing_status: codes_bytes.as_deref().map(|b| Upload::new(&codes_name, b)),
    };

    let result = run_upload(&profile, &request).map_err(audit_err)?;

    if let Some(ref path) = args.out {
        report::write_xlsx(&result, path).map_err(audit_err)?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = args.detail_csv {
        let file = std::fs::File::create(path)
            .map_err(|e| CliError::io(format!("cannot create {}: {e}", path.display())))?;
        payrecon_io::csv::write_detail_csv(&result, file).map_err(audit_err)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{}", report::to_json(&result).map_err(audit_err)?);
    }

    print_summary(&result);

    if args.strict_exit && result.summary.total_mismatches > 0 {
        return Err(CliError {
            code: EXIT_MISMATCHES,
            message: format!("{} mismatched comparison(s)", result.summary.total_mismatches),
            hint: None,
        });
    }
    Ok(())
}

/// Human summary to stderr; stdout stays reserved for `--json`.
fn print_summary(result: &AuditResult) {
    let s = &result.summary;
    let (a, b) = (&result.meta.side_a_label, &result.meta.side_b_label);
    eprintln!(
        "{}: {} employees ({a} {}, {b} {}, both {}) x {} fields = {} comparisons",
        result.meta.profile_name,
        s.employees_total,
        s.employees_a,
        s.employees_b,
        s.employees_in_both,
        s.fields_compared,
        s.total_comparisons,
    );
    eprintln!(
        "mismatches: {} total, {} active; employees with mismatch: {} ({} active)",
        s.total_mismatches, s.active_mismatches, s.employees_with_mismatch, s.active_employees_with_mismatch,
    );
    for status in Status::ALL {
        let count = s.status_counts.get(status.as_str()).copied().unwrap_or(0);
        if count > 0 {
            eprintln!("  {:<48} {count}", status.label(a, b));
        }
    }
    if !result.warnings.is_empty() {
        eprintln!("warnings: {}", result.warnings.len());
        for w in &result.warnings {
            eprintln!("  {}", w.message);
        }
    }
}

pub fn cmd_profile(cmd: ProfileCommands) -> Result<(), CliError> {
    match cmd {
        ProfileCommands::Validate { path } => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
            let profile = AuditProfile::from_toml(&text).map_err(audit_err)?;
            eprintln!(
                "ok: profile '{}' ({} {:?}/{:?}, {} {:?}/{:?}, {} rule(s))",
                profile.name,
                profile.side_a_label,
                profile.side_a.layout,
                profile.side_a.units,
                profile.side_b_label,
                profile.side_b.layout,
                profile.side_b.units,
                profile.rules.len(),
            );
            Ok(())
        }
        ProfileCommands::Show { name } => {
            let profile = AuditProfile::builtin(&name).ok_or_else(|| {
                CliError::args(format!("no built-in profile '{name}'"))
                    .with_hint(format!("built-in profiles: {}", AuditProfile::BUILTINS.join(", ")))
            })?;
            print!("{}", profile.to_toml().map_err(audit_err)?);
            Ok(())
        }
    }
}
