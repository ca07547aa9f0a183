use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use txstore_core::{Money, NormalizedTransaction, Source};

use crate::normalize::{normalize_fields, CategoryChoice, RecordFields};
use crate::validate::large_amount_positions;

/// Columns every import file must carry. `notes` is optional.
pub const REQUIRED_COLUMNS: &[&str] = &["description", "amount", "category", "date"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvImportConfig {
    pub delimiter: String,
    /// Provenance stamped on every imported record.
    pub source: Source,
}

impl CsvImportConfig {
    /// The delimiter as the single byte the reader splits on.
    pub fn delimiter_byte(&self) -> Result<u8, CsvError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(CsvError::InvalidDelimiter(self.delimiter.clone())),
        }
    }

    pub fn validate(&self) -> Result<(), CsvError> {
        self.delimiter_byte().map(|_| ())
    }
}

impl Default for CsvImportConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            source: Source::CsvImport,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CsvImportResult {
    pub success: bool,
    pub data: Vec<NormalizedTransaction>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("File is empty")]
    Empty,
    #[error("Header row has no columns")]
    NoColumns,
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("No data rows")]
    NoDataRows,
    #[error("Delimiter must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(String),
}

/// Lowercased header name to column index.
struct HeaderMap {
    columns: HashMap<String, usize>,
}

impl HeaderMap {
    fn from_record(record: &csv::StringRecord) -> Result<Self, CsvError> {
        let columns: HashMap<String, usize> = record
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();
        if columns.is_empty() {
            return Err(CsvError::NoColumns);
        }
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains_key(**c)) {
            return Err(CsvError::MissingColumn(missing.to_string()));
        }
        Ok(Self { columns })
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        self.columns.get(name).and_then(|idx| record.get(*idx))
    }
}

/// Parse delimited text into normalized records.
///
/// Bad rows are counted and reported as `row N: <reason>` (N counts data rows
/// from 1) and do not stop the import. Only structural problems with the file
/// itself turn `success` off.
pub fn import_csv(content: &str, config: &CsvImportConfig) -> CsvImportResult {
    let mut result = CsvImportResult::default();
    if let Err(e) = read_rows(content, config, &mut result) {
        tracing::warn!("CSV import failed: {e}");
        result.errors.push(e.to_string());
        result.success = false;
        return result;
    }

    let amounts: Vec<Money> = result.data.iter().map(|t| t.amount).collect();
    for pos in large_amount_positions(&amounts) {
        result.warnings.push(format!(
            "{}: unusually large transaction ({})",
            result.data[pos].description, amounts[pos]
        ));
    }

    result.valid_rows = result.data.len();
    result.success = result.valid_rows > 0;
    tracing::debug!(
        total = result.total_rows,
        valid = result.valid_rows,
        invalid = result.invalid_rows,
        "CSV import finished"
    );
    result
}

fn read_rows(content: &str, config: &CsvImportConfig, result: &mut CsvImportResult) -> Result<(), CsvError> {
    let delimiter = config.delimiter_byte()?;
    // Leading blank lines are not the header.
    let content = content.trim_start();
    if content.is_empty() {
        return Err(CsvError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = HeaderMap::from_record(reader.headers()?)?;

    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        result.total_rows += 1;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                result.invalid_rows += 1;
                result.errors.push(format!("row {row}: {e}"));
                continue;
            }
        };

        let fields = RecordFields {
            description: headers.field(&record, "description").unwrap_or_default(),
            amount: headers.field(&record, "amount").unwrap_or_default(),
            date: headers.field(&record, "date").unwrap_or_default(),
            notes: headers.field(&record, "notes").filter(|n| !n.is_empty()),
        };
        let category = CategoryChoice::Named(headers.field(&record, "category").unwrap_or_default());

        match normalize_fields(fields, category, config.source) {
            Ok(tx) => result.data.push(tx),
            Err(e) => {
                result.invalid_rows += 1;
                result.errors.push(format!("row {row}: {e}"));
            }
        }
    }

    if result.total_rows == 0 {
        return Err(CsvError::NoDataRows);
    }
    Ok(())
}
