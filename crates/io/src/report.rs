// Report export: xlsx workbook (Summary, Field_Summary_By_Status, Comparison_Detail) and JSON

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use payrecon::model::{ComparisonRow, Side};
use payrecon::{AuditError, AuditResult, Status};

pub const SUMMARY_SHEET: &str = "Summary";
pub const FIELD_SUMMARY_SHEET: &str = "Field_Summary_By_Status";
pub const DETAIL_SHEET: &str = "Comparison_Detail";

const MAX_COLUMN_WIDTH: usize = 60;

fn export_err(e: XlsxError) -> AuditError {
    AuditError::Export(e.to_string())
}

// ---------------------------------------------------------------------------
// Detail layout (shared with the CSV writer)
// ---------------------------------------------------------------------------

pub fn detail_headers(side_a: &str, side_b: &str) -> Vec<String> {
    vec![
        "Employee ID".into(),
        "First Name".into(),
        "Last Name".into(),
        "Employment Status".into(),
        "State".into(),
        "Field Key".into(),
        "Field".into(),
        format!("{side_a} Column"),
        format!("{side_a} Value"),
        format!("{side_b} Value"),
        format!("{side_a} Value (Normalized)"),
        format!("{side_b} Value (Normalized)"),
        "Status".into(),
        "Rule Applied".into(),
        "Active".into(),
    ]
}

pub fn detail_record(row: &ComparisonRow, side_a: &str, side_b: &str) -> Vec<String> {
    vec![
        row.employee_id.clone(),
        row.context.first_name.clone(),
        row.context.last_name.clone(),
        row.context.employment_status.clone(),
        row.context.state.clone(),
        row.field_key.clone(),
        row.field_label.clone(),
        row.source_column.clone().unwrap_or_default(),
        row.value_a_raw.clone(),
        row.value_b_raw.clone(),
        row.value_a_norm.clone(),
        row.value_b_norm.clone(),
        row.status.label(side_a, side_b),
        row.rule.clone(),
        if row.is_active { "Yes" } else { "No" }.into(),
    ]
}

/// (label, value) metric rows shown at the top of the Summary sheet.
pub fn summary_metrics(result: &AuditResult) -> Vec<(String, usize)> {
    let s = &result.summary;
    let (a, b) = (&result.meta.side_a_label, &result.meta.side_b_label);
    let mut rows = vec![
        (format!("Employees in {a}"), s.employees_a),
        (format!("Employees in {b}"), s.employees_b),
        ("Employees in both".to_string(), s.employees_in_both),
        (format!("Employees missing in {b}"), s.employees_only_a),
        (format!("Employees missing in {a}"), s.employees_only_b),
        ("Total employees".to_string(), s.employees_total),
        ("Fields compared".to_string(), s.fields_compared),
        ("Total comparisons".to_string(), s.total_comparisons),
        ("Total mismatches".to_string(), s.total_mismatches),
        ("Active mismatches".to_string(), s.active_mismatches),
        ("Employees with any mismatch".to_string(), s.employees_with_mismatch),
        ("Active employees with any mismatch".to_string(), s.active_employees_with_mismatch),
    ];
    for status in Status::ALL {
        let count = s.status_counts.get(status.as_str()).copied().unwrap_or(0);
        rows.push((status.label(a, b), count));
    }
    rows
}

// ---------------------------------------------------------------------------
// Sheet builder with column-width tracking
// ---------------------------------------------------------------------------

struct SheetBuilder {
    sheet: Worksheet,
    widths: Vec<usize>,
    row: u32,
    bold: Format,
}

impl SheetBuilder {
    fn new(name: &str) -> Result<Self, AuditError> {
        let mut sheet = Worksheet::new();
        sheet.set_name(name).map_err(export_err)?;
        Ok(Self {
            sheet,
            widths: Vec::new(),
            row: 0,
            bold: Format::new().set_bold(),
        })
    }

    fn track(&mut self, col: usize, text_len: usize) {
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0);
        }
        self.widths[col] = self.widths[col].max(text_len);
    }

    fn header<S: AsRef<str>>(&mut self, cells: &[S]) -> Result<(), AuditError> {
        for (col, cell) in cells.iter().enumerate() {
            let text = cell.as_ref();
            self.sheet
                .write_string_with_format(self.row, col as u16, text, &self.bold)
                .map_err(export_err)?;
            self.track(col, text.chars().count());
        }
        self.row += 1;
        Ok(())
    }

    fn text_row<S: AsRef<str>>(&mut self, cells: &[S]) -> Result<(), AuditError> {
        for (col, cell) in cells.iter().enumerate() {
            let text = cell.as_ref();
            if !text.is_empty() {
                self.sheet.write_string(self.row, col as u16, text).map_err(export_err)?;
            }
            self.track(col, text.chars().count());
        }
        self.row += 1;
        Ok(())
    }

    fn metric(&mut self, label: &str, value: usize) -> Result<(), AuditError> {
        self.sheet.write_string(self.row, 0, label).map_err(export_err)?;
        self.sheet.write_number(self.row, 1, value as f64).map_err(export_err)?;
        self.track(0, label.chars().count());
        self.track(1, value.to_string().len());
        self.row += 1;
        Ok(())
    }

    fn blank(&mut self) {
        self.row += 1;
    }

    fn finish(mut self) -> Result<Worksheet, AuditError> {
        for (col, len) in self.widths.iter().enumerate() {
            let width = (*len + 2).min(MAX_COLUMN_WIDTH);
            self.sheet.set_column_width(col as u16, width as f64).map_err(export_err)?;
        }
        Ok(self.sheet)
    }
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

fn summary_sheet(result: &AuditResult) -> Result<Worksheet, AuditError> {
    let (a, b) = (&result.meta.side_a_label, &result.meta.side_b_label);
    let mut sb = SheetBuilder::new(SUMMARY_SHEET)?;

    sb.header(&["Metric", "Value"])?;
    sb.text_row(&["Report generated", result.meta.run_at.as_str()])?;
    sb.text_row(&["Profile", result.meta.profile_name.as_str()])?;
    for (label, value) in summary_metrics(result) {
        sb.metric(&label, value)?;
    }

    if !result.notes.is_empty() {
        sb.blank();
        sb.header(&["Normalization Notes"])?;
        for note in &result.notes {
            sb.text_row(&[note.as_str()])?;
        }
    }

    if !result.warnings.is_empty() {
        sb.blank();
        sb.header(&["Warnings"])?;
        for w in &result.warnings {
            sb.text_row(&[w.message.as_str()])?;
        }
    }

    sb.blank();
    sb.header(&["Missing Employees"])?;
    sb.header(&["Employee ID", "Missing In", "First Name", "Last Name", "Employment Status", "State"])?;
    for m in &result.missing {
        let missing_in = match m.missing_on {
            Side::A => a.as_str(),
            Side::B => b.as_str(),
        };
        sb.text_row(&[
            m.employee_id.as_str(),
            missing_in,
            m.context.first_name.as_str(),
            m.context.last_name.as_str(),
            m.context.employment_status.as_str(),
            m.context.state.as_str(),
        ])?;
    }

    sb.finish()
}

fn field_summary_sheet(result: &AuditResult) -> Result<Worksheet, AuditError> {
    let (a, b) = (&result.meta.side_a_label, &result.meta.side_b_label);
    let mut sb = SheetBuilder::new(FIELD_SUMMARY_SHEET)?;

    let mut headers = vec!["Field Key".to_string(), "Field".to_string()];
    headers.extend(Status::ALL.iter().map(|s| s.label(a, b)));
    headers.push("Total".into());
    sb.header(&headers)?;

    for row in &result.field_summary {
        sb.text_row(&[row.field_key.as_str(), row.field_label.as_str()])?;
        let r = sb.row - 1;
        for (i, status) in Status::ALL.iter().enumerate() {
            let col = (i + 2) as u16;
            sb.sheet
                .write_number(r, col, row.count(*status) as f64)
                .map_err(export_err)?;
        }
        sb.sheet
            .write_number(r, (Status::ALL.len() + 2) as u16, row.total as f64)
            .map_err(export_err)?;
    }

    sb.finish()
}

fn detail_sheet(result: &AuditResult) -> Result<Worksheet, AuditError> {
    let (a, b) = (&result.meta.side_a_label, &result.meta.side_b_label);
    let mut sb = SheetBuilder::new(DETAIL_SHEET)?;
    sb.header(&detail_headers(a, b))?;
    for row in &result.detail {
        sb.text_row(&detail_record(row, a, b))?;
    }
    sb.finish()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn build_workbook(result: &AuditResult) -> Result<Workbook, AuditError> {
    let mut workbook = Workbook::new();
    workbook.push_worksheet(summary_sheet(result)?);
    workbook.push_worksheet(field_summary_sheet(result)?);
    workbook.push_worksheet(detail_sheet(result)?);
    Ok(workbook)
}

pub fn xlsx_bytes(result: &AuditResult) -> Result<Vec<u8>, AuditError> {
    build_workbook(result)?.save_to_buffer().map_err(export_err)
}

pub fn write_xlsx(result: &AuditResult, path: &Path) -> Result<(), AuditError> {
    build_workbook(result)?.save(path).map_err(export_err)?;
    log::info!("report written to {}", path.display());
    Ok(())
}

pub fn to_json(result: &AuditResult) -> Result<String, AuditError> {
    serde_json::to_string_pretty(result).map_err(|e| AuditError::Export(e.to_string()))
}
