use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use txstore_core::NormalizedTransaction;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Confirmation hash handed back by the service.
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Submission rejected: {0}")]
    Rejected(String),
    #[error("Submission service unavailable: {0}")]
    Unavailable(String),
}

/// Abstraction over the external submit-and-confirm service.
/// The same record may be sent more than once when retries kick in.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        record: &NormalizedTransaction,
        gas_limit: u64,
    ) -> Result<SubmitReceipt, SubmitError>;
}

// ── Mock submitter (always available, used for tests and dry runs) ───────────

/// Confirms everything except descriptions scripted to fail a number of times.
#[derive(Default)]
pub struct MockSubmitter {
    failures: Mutex<HashMap<String, u32>>,
    calls: AtomicUsize,
    submitted: Mutex<Vec<Uuid>>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the record with this description for its next `times` submissions.
    pub fn fail_times(self, description: &str, times: u32) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(description.to_string(), times);
        }
        self
    }

    pub fn always_fail(self, description: &str) -> Self {
        self.fail_times(description, u32::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Record ids in submission order, duplicates included.
    pub fn submitted(&self) -> Vec<Uuid> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn take_failure(&self, description: &str) -> bool {
        let Ok(mut failures) = self.failures.lock() else {
            return false;
        };
        match failures.get_mut(description) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(
        &self,
        record: &NormalizedTransaction,
        _gas_limit: u64,
    ) -> Result<SubmitReceipt, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(record.id);
        }
        tokio::task::yield_now().await;

        if self.take_failure(&record.description) {
            return Err(SubmitError::Rejected(format!("mock rejection for '{}'", record.description)));
        }
        Ok(SubmitReceipt { hash: format!("0x{}", record.id.simple()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use txstore_core::{Category, Money, Source};

    fn record(desc: &str) -> NormalizedTransaction {
        NormalizedTransaction::new(
            desc,
            Money::from_cents(2500),
            Category::Income,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            None,
            Source::Manual,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn mock_confirms_with_id_hash() {
        let mock = MockSubmitter::new();
        let tx = record("Salary");
        let receipt = mock.submit(&tx, 21_000).await.unwrap();
        assert_eq!(receipt.hash, format!("0x{}", tx.id.simple()));
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.submitted(), vec![tx.id]);
    }

    #[tokio::test]
    async fn scripted_failures_run_out() {
        let mock = MockSubmitter::new().fail_times("Flaky", 2);
        let tx = record("Flaky");
        assert!(mock.submit(&tx, 1).await.is_err());
        assert!(mock.submit(&tx, 1).await.is_err());
        assert!(mock.submit(&tx, 1).await.is_ok());
        assert_eq!(mock.calls(), 3);
    }
}
