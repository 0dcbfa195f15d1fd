use std::path::{Path, PathBuf};

use payrecon::{AuditProfile, Status};
use payrecon_io::report::{self, DETAIL_SHEET, FIELD_SUMMARY_SHEET, SUMMARY_SHEET};
use payrecon_io::{load_table, run_upload, SheetSelector, Upload, UploadRequest};
use rust_xlsxwriter::Workbook;

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures").join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// Copy a CSV fixture into a one-sheet workbook on disk, below a blank row.
fn csv_to_xlsx(csv_bytes: &[u8], sheet: &str, path: &Path) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name(sheet).unwrap();
    let mut rdr = csv::ReaderBuilder::new().has_headers(false).from_reader(csv_bytes);
    for (r, rec) in rdr.records().enumerate() {
        for (c, val) in rec.unwrap().iter().enumerate() {
            ws.write_string(r as u32 + 1, c as u16, val).unwrap();
        }
    }
    wb.save(path).unwrap();
}

fn csv_to_tsv(csv_bytes: &[u8]) -> Vec<u8> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(false).from_reader(csv_bytes);
    let mut out = String::new();
    for rec in rdr.records() {
        let rec = rec.unwrap();
        out.push_str(&rec.iter().collect::<Vec<_>>().join("\t"));
        out.push('\n');
    }
    out.into_bytes()
}

#[test]
fn withholding_uploads_produce_a_full_report() {
    let dir = tempfile::tempdir().unwrap();

    let side_a_path = dir.path().join("paycom.xlsx");
    csv_to_xlsx(&fixture("paycom_withholding.csv"), "Paycom Export", &side_a_path);
    let side_a_bytes = std::fs::read(&side_a_path).unwrap();
    let side_b_bytes = csv_to_tsv(&fixture("uzio_withholding_long.csv"));
    let mapping_bytes = fixture("withholding_mapping.csv");
    let labels_bytes = fixture("key_mapping.yml");
    let codes_bytes = fixture("filing_status.txt");

    let request = UploadRequest {
        side_a: Upload::new("paycom.xlsx", &side_a_bytes).with_sheet(SheetSelector::keywords(["paycom"])),
        side_b: Upload::new("uzio.txt", &side_b_bytes),
        mapping: Upload::new("withholding_mapping.csv", &mapping_bytes),
        labels: Some(Upload::new("key_mapping.yml", &labels_bytes)),
        filing_status: Some(Upload::new("filing_status.txt", &codes_bytes)),
    };
    let result = run_upload(&AuditProfile::withholding(), &request).unwrap();

    assert_eq!(result.detail.len(), 16);
    assert_eq!(result.summary.total_mismatches, 10);
    assert_eq!(result.summary.active_mismatches, 2);
    let e1 = result
        .detail
        .iter()
        .find(|r| r.employee_id == "E1" && r.field_key == "FIT_ADDL_WITHHOLDING_PER_PAY_PERIOD")
        .unwrap();
    assert_eq!(e1.status, Status::Match);
    assert_eq!(e1.field_label, "Extra Withholding");

    // xlsx report
    let report_path = dir.path().join("audit.xlsx");
    report::write_xlsx(&result, &report_path).unwrap();
    let report_bytes = std::fs::read(&report_path).unwrap();
    let names = payrecon_io::xlsx::sheet_names("audit.xlsx", &report_bytes).unwrap();
    assert_eq!(names, vec![SUMMARY_SHEET, FIELD_SUMMARY_SHEET, DETAIL_SHEET]);

    let summary = load_table(&Upload::new("audit.xlsx", &report_bytes)).unwrap();
    assert_eq!(summary.columns(), &["Metric", "Value"]);
    let total_row = summary
        .rows()
        .iter()
        .find(|r| r[0] == "Total mismatches")
        .expect("total mismatches metric");
    assert_eq!(total_row[1], "10");

    let fields = load_table(
        &Upload::new("audit.xlsx", &report_bytes).with_sheet(SheetSelector::Named(FIELD_SUMMARY_SHEET.into())),
    )
    .unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields.width(), 2 + Status::ALL.len() + 1);

    // detail CSV
    let csv_path = dir.path().join("detail.csv");
    let file = std::fs::File::create(&csv_path).unwrap();
    payrecon_io::csv::write_detail_csv(&result, file).unwrap();
    let csv_bytes = std::fs::read(&csv_path).unwrap();
    let detail = load_table(&Upload::new("detail.csv", &csv_bytes)).unwrap();
    assert_eq!(detail.len(), 16);
    let status_col = detail.find_column("Status").unwrap();
    assert!(detail
        .rows()
        .iter()
        .any(|r| r[status_col] == "Employee ID Not Found in Uzio"));
}
