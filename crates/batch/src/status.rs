use serde::{Deserialize, Serialize};
use txstore_core::NormalizedTransaction;

use crate::orchestrator::CancelHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Pending,
    Submitting,
    Confirmed,
    Failed,
    Cancelled,
}

impl BatchItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchItemStatus::Pending => "pending",
            BatchItemStatus::Submitting => "submitting",
            BatchItemStatus::Confirmed => "confirmed",
            BatchItemStatus::Failed => "failed",
            BatchItemStatus::Cancelled => "cancelled",
        }
    }

    /// Confirmed, failed and cancelled items never move again during a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchItemStatus::Confirmed | BatchItemStatus::Failed | BatchItemStatus::Cancelled
        )
    }
}

impl std::fmt::Display for BatchItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission tracking for one record.
///
/// Every transition method returns `false` and leaves the item untouched when
/// the move is not allowed from the current state, so applying a late result
/// to a cancelled item is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub transaction: NormalizedTransaction,
    pub status: BatchItemStatus,
    pub progress: u8,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub tx_hash: Option<String>,
}

impl BatchItem {
    pub fn new(transaction: NormalizedTransaction) -> Self {
        Self {
            transaction,
            status: BatchItemStatus::Pending,
            progress: 0,
            attempts: 0,
            last_error: None,
            tx_hash: None,
        }
    }

    pub fn begin_submit(&mut self) -> bool {
        if self.status != BatchItemStatus::Pending {
            return false;
        }
        self.status = BatchItemStatus::Submitting;
        self.progress = 50;
        true
    }

    pub fn confirm(&mut self, hash: String) -> bool {
        if self.status != BatchItemStatus::Submitting {
            return false;
        }
        self.status = BatchItemStatus::Confirmed;
        self.progress = 100;
        self.tx_hash = Some(hash);
        self.last_error = None;
        true
    }

    /// Records a failed attempt. With `requeue` the item goes back to pending,
    /// otherwise it is failed for good.
    pub fn fail(&mut self, error: String, requeue: bool) -> bool {
        if self.status != BatchItemStatus::Submitting {
            return false;
        }
        self.attempts += 1;
        self.last_error = Some(error);
        if requeue {
            self.status = BatchItemStatus::Pending;
            self.progress = 0;
        } else {
            self.status = BatchItemStatus::Failed;
            self.progress = 100;
        }
        true
    }

    pub fn cancel(&mut self) -> bool {
        if !matches!(self.status, BatchItemStatus::Pending | BatchItemStatus::Submitting) {
            return false;
        }
        self.status = BatchItemStatus::Cancelled;
        true
    }

    /// Failed items only; gives the item a fresh attempt budget.
    pub fn reset_for_retry(&mut self) -> bool {
        if self.status != BatchItemStatus::Failed {
            return false;
        }
        self.status = BatchItemStatus::Pending;
        self.progress = 0;
        self.attempts = 0;
        true
    }
}

/// Full snapshot of a batch. The counters always agree with `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub items: Vec<BatchItem>,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Items still waiting or in flight.
    pub pending: usize,
    pub is_processing: bool,
}

impl BatchStatus {
    pub fn new(records: Vec<NormalizedTransaction>) -> Self {
        let mut status = Self {
            items: records.into_iter().map(BatchItem::new).collect(),
            total: 0,
            completed: 0,
            failed: 0,
            pending: 0,
            is_processing: false,
        };
        status.recount();
        status
    }

    pub(crate) fn recount(&mut self) {
        self.total = self.items.len();
        self.completed = self.count(BatchItemStatus::Confirmed);
        self.failed = self.count(BatchItemStatus::Failed);
        self.pending = self.count(BatchItemStatus::Pending) + self.count(BatchItemStatus::Submitting);
    }

    fn count(&self, status: BatchItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Cancels every pending or in-flight item. Returns how many moved.
    pub(crate) fn cancel_open_items(&mut self) -> usize {
        let moved = self.items.iter_mut().map(BatchItem::cancel).filter(|m| *m).count();
        self.recount();
        moved
    }

    /// Confirmed records with their confirmation hash, in batch order.
    pub fn confirmed(&self) -> impl Iterator<Item = (&NormalizedTransaction, &str)> {
        self.items.iter().filter_map(|item| match (&item.status, &item.tx_hash) {
            (BatchItemStatus::Confirmed, Some(hash)) => Some((&item.transaction, hash.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub pending: usize,
    pub submitting: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Nothing left waiting or in flight.
    pub is_complete: bool,
}

pub fn get_batch_summary(status: &BatchStatus) -> BatchSummary {
    let mut summary = BatchSummary {
        total: status.items.len(),
        pending: 0,
        submitting: 0,
        confirmed: 0,
        failed: 0,
        cancelled: 0,
        is_complete: false,
    };
    for item in &status.items {
        match item.status {
            BatchItemStatus::Pending => summary.pending += 1,
            BatchItemStatus::Submitting => summary.submitting += 1,
            BatchItemStatus::Confirmed => summary.confirmed += 1,
            BatchItemStatus::Failed => summary.failed += 1,
            BatchItemStatus::Cancelled => summary.cancelled += 1,
        }
    }
    summary.is_complete = summary.pending == 0 && summary.submitting == 0;
    summary
}

/// Stops a batch from the caller's side. Raises `handle` so the run driving
/// the batch halts before its next chunk, and returns the cancelled view of
/// `status`. Safe to call any number of times.
pub fn cancel_batch_processing(status: &BatchStatus, handle: &CancelHandle) -> BatchStatus {
    handle.cancel();
    let mut next = status.clone();
    next.cancel_open_items();
    next.is_processing = false;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use txstore_core::{Category, Money, Source};

    fn record(desc: &str) -> NormalizedTransaction {
        NormalizedTransaction::new(
            desc,
            Money::from_cents(-1000),
            Category::Expense,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            None,
            Source::Manual,
        )
        .unwrap()
    }

    #[test]
    fn happy_path_transitions() {
        let mut item = BatchItem::new(record("a"));
        assert!(item.begin_submit());
        assert_eq!(item.progress, 50);
        assert!(item.confirm("0xabc".into()));
        assert_eq!(item.status, BatchItemStatus::Confirmed);
        assert_eq!(item.progress, 100);
        assert_eq!(item.tx_hash.as_deref(), Some("0xabc"));
    }

    #[test]
    fn illegal_transitions_are_noops() {
        let mut item = BatchItem::new(record("a"));
        assert!(!item.confirm("0x1".into()));
        assert!(!item.fail("boom".into(), false));
        assert_eq!(item.status, BatchItemStatus::Pending);

        assert!(item.cancel());
        assert!(!item.cancel());
        assert!(!item.begin_submit());
        assert!(!item.confirm("0x1".into()));
        assert_eq!(item.status, BatchItemStatus::Cancelled);
        assert!(item.tx_hash.is_none());
    }

    #[test]
    fn failure_with_and_without_requeue() {
        let mut item = BatchItem::new(record("a"));
        item.begin_submit();
        assert!(item.fail("nonce too low".into(), true));
        assert_eq!(item.status, BatchItemStatus::Pending);
        assert_eq!(item.attempts, 1);

        item.begin_submit();
        item.fail("nonce too low".into(), false);
        assert_eq!(item.status, BatchItemStatus::Failed);
        assert_eq!(item.attempts, 2);
        assert_eq!(item.last_error.as_deref(), Some("nonce too low"));

        assert!(item.reset_for_retry());
        assert_eq!(item.attempts, 0);
        assert_eq!(item.status, BatchItemStatus::Pending);
    }

    #[test]
    fn counts_follow_items() {
        let mut status = BatchStatus::new(vec![record("a"), record("b"), record("c")]);
        assert_eq!((status.total, status.pending, status.completed), (3, 3, 0));

        status.items[0].begin_submit();
        status.items[0].confirm("0x1".into());
        status.items[1].begin_submit();
        status.items[1].fail("x".into(), false);
        status.recount();
        assert_eq!((status.completed, status.failed, status.pending), (1, 1, 1));
        assert_eq!(status.confirmed().count(), 1);
    }

    #[test]
    fn summary_is_pure() {
        let mut status = BatchStatus::new(vec![record("a"), record("b")]);
        status.items[0].begin_submit();
        status.items[0].confirm("0x1".into());
        status.recount();

        let first = get_batch_summary(&status);
        let second = get_batch_summary(&status);
        assert_eq!(first, second);
        assert_eq!(first.confirmed, 1);
        assert_eq!(first.pending, 1);
        assert!(!first.is_complete);
    }

    #[test]
    fn cancel_is_idempotent_and_keeps_finished_items() {
        let mut status = BatchStatus::new(vec![record("a"), record("b"), record("c")]);
        status.is_processing = true;
        status.items[0].begin_submit();
        status.items[0].confirm("0x1".into());
        status.items[1].begin_submit();
        status.recount();

        let handle = CancelHandle::new();
        let once = cancel_batch_processing(&status, &handle);
        let twice = cancel_batch_processing(&once, &handle);
        assert!(handle.is_cancelled());
        assert_eq!(once, twice);
        assert!(!once.is_processing);
        assert_eq!(once.items[0].status, BatchItemStatus::Confirmed);
        assert_eq!(once.items[1].status, BatchItemStatus::Cancelled);
        assert_eq!(once.items[2].status, BatchItemStatus::Cancelled);
        assert_eq!(once.pending, 0);
        assert!(get_batch_summary(&once).is_complete);
    }
}
