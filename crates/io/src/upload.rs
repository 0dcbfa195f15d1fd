// Byte-blob boundary: uploaded files in, AuditResult out

use std::path::Path;

use payrecon::{run, AuditError, AuditInput, AuditProfile, AuditResult, FieldLabels, FilingStatusCodes, ReferenceDictionaries, Table};

use crate::csv::{decode_text, parse_delimited, sniff_delimiter};
use crate::xlsx::{read_workbook, SheetSelector};

/// How a file is parsed, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// `.csv`: comma separated.
    Csv,
    /// `.txt` / `.tsv`: delimiter sniffed, tab preferred.
    Delimited,
    /// Anything else is read as a spreadsheet workbook.
    Workbook,
}

impl TableFormat {
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Self::Csv,
            "txt" | "tsv" => Self::Delimited,
            _ => Self::Workbook,
        }
    }
}

/// One uploaded file. The filename only selects the parser.
#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
    pub sheet: SheetSelector,
}

impl<'a> Upload<'a> {
    pub fn new(filename: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            filename,
            bytes,
            sheet: SheetSelector::First,
        }
    }

    pub fn with_sheet(mut self, sheet: SheetSelector) -> Self {
        self.sheet = sheet;
        self
    }
}

/// Everything one run needs, as uploaded.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub side_a: Upload<'a>,
    pub side_b: Upload<'a>,
    pub mapping: Upload<'a>,
    /// Field-key to label YAML.
    pub labels: Option<Upload<'a>>,
    /// `CODE("Label")` filing-status text.
    pub filing_status: Option<Upload<'a>>,
}

/// Parse uploaded bytes into a Table. All cells stay strings.
pub fn load_table(upload: &Upload<'_>) -> Result<Table, AuditError> {
    let format = TableFormat::from_filename(upload.filename);
    log::debug!("loading {} as {:?}", upload.filename, format);
    match format {
        TableFormat::Csv => parse_delimited(upload.filename, &decode_text(upload.bytes), b','),
        TableFormat::Delimited => {
            let text = decode_text(upload.bytes);
            let delimiter = sniff_delimiter(&text);
            parse_delimited(upload.filename, &text, delimiter)
        }
        TableFormat::Workbook => read_workbook(upload.filename, upload.bytes, &upload.sheet),
    }
}

/// Parse the optional reference dictionaries.
pub fn load_dictionaries(
    labels: Option<&Upload<'_>>,
    filing_status: Option<&Upload<'_>>,
) -> Result<ReferenceDictionaries, AuditError> {
    let labels = labels
        .map(|u| FieldLabels::from_yaml_str(&decode_text(u.bytes)))
        .transpose()?;
    let filing_status = filing_status
        .map(|u| FilingStatusCodes::from_text(&decode_text(u.bytes)))
        .transpose()?;
    Ok(ReferenceDictionaries { labels, filing_status })
}

/// Load every upload, then run the engine. Any load or schema failure aborts
/// before comparison starts.
pub fn run_upload(profile: &AuditProfile, request: &UploadRequest<'_>) -> Result<AuditResult, AuditError> {
    let input = AuditInput {
        side_a: load_table(&request.side_a)?,
        side_b: load_table(&request.side_b)?,
        mapping: load_table(&request.mapping)?,
        dictionaries: load_dictionaries(request.labels.as_ref(), request.filing_status.as_ref())?,
    };
    run(profile, &input)
}
