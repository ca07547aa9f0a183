pub mod csv;
pub mod extract;
pub mod formats;
pub mod normalize;
pub mod rules;
pub mod statement;
pub(crate) mod util;
pub mod validate;

pub use self::csv::{import_csv, CsvError, CsvImportConfig, CsvImportResult};
pub use extract::{
    ChunkScanExtractor, DocumentExtractor, ExtractConfig, ExtractError, PdfTextExtractor,
    TextExtractor, SAMPLE_STATEMENT,
};
pub use formats::{catalog, detect_format, AmountLayout, StatementFormat};
pub use normalize::{normalize_fields, CategoryChoice, NormalizeError, RecordFields};
pub use rules::{AmountSign, CategoryRule, CategoryRuleEngine, MatchType as RuleMatchType};
pub use statement::{StatementParseResult, StatementParser};
pub use validate::{ValidationReport, Validator};
