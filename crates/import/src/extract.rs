use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Document is empty")]
    Empty,
    #[error("PDF text layer could not be read: {0}")]
    Pdf(String),
    #[error("No readable text found in document ({0} readable characters)")]
    Unreadable(usize),
}

/// Abstraction over "plain text from document bytes".
/// The statement parser only ever sees the returned text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, data: &[u8]) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Bytes per scan window in the chunk scanner.
    pub chunk_size: usize,
    /// A decoded window is kept only with at least this many readable characters.
    pub min_chunk_chars: usize,
    /// Below this many readable characters the extraction counts as failed.
    pub min_total_chars: usize,
    /// Substitute [`SAMPLE_STATEMENT`] when nothing readable is found.
    pub sample_fallback: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            min_chunk_chars: 20,
            min_total_chars: 50,
            sample_fallback: false,
        }
    }
}

/// Demo statement used when `sample_fallback` is enabled.
pub const SAMPLE_STATEMENT: &str = "\
STANDARD BANK
Statement of Account
Account Number: ****0000
Date        Description      Debit    Credit   Balance
Opening Balance                                  1,500.00
01/03/2024  GROCERY OUTLET   82.14   0.00   1,417.86
01/05/2024  SHELL OIL GAS STATION   45.00   0.00   1,372.86
01/08/2024  PAYROLL DEPOSIT   0.00   2,250.00   3,622.86
01/12/2024  CITY WATER BILL UTILITY   61.30   0.00   3,561.56
Closing Balance 3,561.56
";

fn readable_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

// ── PDF text layer ────────────────────────────────────────────────────────────

/// Reads the PDF content streams through `pdf-extract`.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, ExtractError> {
        if data.is_empty() {
            return Err(ExtractError::Empty);
        }
        pdf_extract::extract_text_from_mem(data).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

// ── Byte-chunk scanner ────────────────────────────────────────────────────────

/// Scans fixed-size byte windows, decodes them lossily and keeps the windows
/// that still hold enough printable text. Crude, but works on uncompressed
/// PDFs and on plain-text exports.
pub struct ChunkScanExtractor {
    config: ExtractConfig,
}

impl ChunkScanExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    fn scan(&self, data: &[u8]) -> String {
        let chunk_size = self.config.chunk_size.max(1);
        data.chunks(chunk_size)
            .map(|chunk| {
                String::from_utf8_lossy(chunk)
                    .chars()
                    .filter(|c| *c == '\n' || *c == '\t' || (!c.is_control() && *c != '\u{FFFD}'))
                    .collect::<String>()
            })
            .filter(|text| readable_chars(text) >= self.config.min_chunk_chars)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TextExtractor for ChunkScanExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, ExtractError> {
        if data.is_empty() {
            return Err(ExtractError::Empty);
        }
        let text = self.scan(data);
        let readable = readable_chars(&text);
        if readable >= self.config.min_total_chars {
            return Ok(text);
        }
        if self.config.sample_fallback {
            tracing::warn!(readable, "no readable text in document, using sample statement");
            return Ok(SAMPLE_STATEMENT.to_string());
        }
        Err(ExtractError::Unreadable(readable))
    }
}

// ── Layered default ───────────────────────────────────────────────────────────

/// PDF text layer first; the chunk scanner when the bytes are not a PDF or
/// the text layer comes back empty.
pub struct DocumentExtractor {
    pdf: PdfTextExtractor,
    scanner: ChunkScanExtractor,
    min_total_chars: usize,
}

impl DocumentExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            pdf: PdfTextExtractor,
            min_total_chars: config.min_total_chars,
            scanner: ChunkScanExtractor::new(config),
        }
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(ExtractConfig::default())
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, ExtractError> {
        if data.is_empty() {
            return Err(ExtractError::Empty);
        }
        if data.starts_with(b"%PDF") {
            match self.pdf.extract_text(data) {
                Ok(text) if readable_chars(&text) >= self.min_total_chars => return Ok(text),
                Ok(_) => tracing::warn!("PDF text layer is empty, scanning raw bytes"),
                Err(e) => tracing::warn!("PDF text layer unavailable ({e}), scanning raw bytes"),
            }
        }
        self.scanner.extract_text(data)
    }
}
