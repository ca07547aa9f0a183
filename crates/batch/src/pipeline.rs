use serde::Serialize;
use txstore_core::{NormalizedTransaction, RecordSink, Source};
use txstore_import::{CategoryRuleEngine, CsvImportResult, StatementParseResult, Validator};

use crate::orchestrator::{BatchError, BatchOrchestrator};
use crate::status::BatchStatus;
use crate::submitter::Submitter;

/// Result of one end-to-end import: data problems from parsing and
/// validation, plus the final batch state.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub status: BatchStatus,
}

/// Orchestrates: validate → record locally → submit in chunks.
pub struct ImportPipeline<'a, S: Submitter + ?Sized> {
    rules: &'a CategoryRuleEngine,
    orchestrator: BatchOrchestrator<'a, S>,
}

impl<'a, S: Submitter + ?Sized> ImportPipeline<'a, S> {
    pub fn new(rules: &'a CategoryRuleEngine, orchestrator: BatchOrchestrator<'a, S>) -> Self {
        Self { rules, orchestrator }
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator<'a, S> {
        &self.orchestrator
    }

    /// Every record reaches the sink before any submission starts, whatever
    /// the submission outcome turns out to be.
    pub async fn submit_records<K, F>(
        &self,
        records: Vec<NormalizedTransaction>,
        sink: &mut K,
        on_status: F,
    ) -> Result<BatchStatus, BatchError>
    where
        K: RecordSink + ?Sized,
        F: FnMut(&BatchStatus),
    {
        for record in &records {
            sink.add_record(record);
        }
        self.orchestrator.submit_batch(records, on_status).await
    }

    pub async fn import_statement<K, F>(
        &self,
        parsed: &StatementParseResult,
        sink: &mut K,
        on_status: F,
    ) -> Result<ImportOutcome, BatchError>
    where
        K: RecordSink + ?Sized,
        F: FnMut(&BatchStatus),
    {
        let report = Validator::new(self.rules, Source::PdfImport).validate(&parsed.transactions);

        let mut errors = parsed.errors.clone();
        errors.extend(report.errors);
        let mut warnings = parsed.warnings.clone();
        warnings.extend(report.warnings);

        let status = self.submit_records(report.transactions, sink, on_status).await?;
        Ok(ImportOutcome { errors, warnings, status })
    }

    pub async fn import_csv<K, F>(
        &self,
        imported: CsvImportResult,
        sink: &mut K,
        on_status: F,
    ) -> Result<ImportOutcome, BatchError>
    where
        K: RecordSink + ?Sized,
        F: FnMut(&BatchStatus),
    {
        let status = self.submit_records(imported.data, sink, on_status).await?;
        Ok(ImportOutcome {
            errors: imported.errors,
            warnings: imported.warnings,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::status::BatchItemStatus;
    use crate::submitter::MockSubmitter;
    use txstore_import::{import_csv, CsvImportConfig, StatementParser};

    const STATEMENT: &str = "\
STANDARD BANK
Account Number: ****4821
Date        Description      Debit    Credit   Balance
10/02/2024  POS PURCHASE   4.23   65.73
10/03/2024  WHOLE FOODS MARKET   52.10   13.63
10/04/2024  REFUND   0.00   25.00   38.63
";

    #[tokio::test]
    async fn statement_records_are_sunk_then_submitted() {
        let rules = CategoryRuleEngine::default();
        let mock = MockSubmitter::new().always_fail("REFUND");
        let config = BatchConfig { max_retries: 0, ..BatchConfig::default() };
        let pipeline = ImportPipeline::new(&rules, BatchOrchestrator::new(&mock, config).unwrap());

        let parsed = StatementParser::new(&rules).parse(STATEMENT);
        let mut ledger: Vec<NormalizedTransaction> = Vec::new();
        let outcome = pipeline.import_statement(&parsed, &mut ledger, |_| {}).await.unwrap();

        // The failed submission is still in the local ledger.
        assert_eq!(ledger.len(), 3);
        assert!(ledger.iter().all(|t| t.source == Source::PdfImport));
        assert_eq!(outcome.status.completed, 2);
        assert_eq!(outcome.status.items[2].status, BatchItemStatus::Failed);
        assert_eq!(outcome.status.confirmed().count(), 2);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn csv_rows_flow_through_with_row_errors() {
        let rules = CategoryRuleEngine::default();
        let mock = MockSubmitter::new();
        let pipeline = ImportPipeline::new(&rules, BatchOrchestrator::new(&mock, BatchConfig::default()).unwrap());

        let imported = import_csv(
            "description,amount,category,date\nCoffee,-4.50,expense,2024-01-05\nBad,0,expense,2024-01-05\n",
            &CsvImportConfig::default(),
        );
        let mut ledger: Vec<NormalizedTransaction> = Vec::new();
        let outcome = pipeline.import_csv(imported, &mut ledger, |_| {}).await.unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("row 2:"));
        assert_eq!(outcome.status.completed, 1);
        assert_eq!(mock.calls(), 1);
    }
}
