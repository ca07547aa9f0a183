use crate::transaction::NormalizedTransaction;

/// The local ledger that receives every validated record before submission.
///
/// Recording is synchronous and never waits on the submission outcome.
pub trait RecordSink {
    fn add_record(&mut self, record: &NormalizedTransaction);
}

impl RecordSink for Vec<NormalizedTransaction> {
    fn add_record(&mut self, record: &NormalizedTransaction) {
        self.push(record.clone());
    }
}
