use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use txstore_core::NormalizedTransaction;

use crate::config::{BatchConfig, ConfigError};
use crate::status::{BatchItemStatus, BatchStatus};
use crate::submitter::Submitter;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid batch configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("No failed transactions to retry")]
    NothingToRetry,
}

/// Cooperative cancellation flag shared with a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Submits records in bounded chunks, one chunk in flight at a time.
pub struct BatchOrchestrator<'a, S: Submitter + ?Sized> {
    submitter: &'a S,
    config: BatchConfig,
    cancel: CancelHandle,
}

impl<'a, S: Submitter + ?Sized> BatchOrchestrator<'a, S> {
    /// Fails on an invalid config so no batch is ever created with one.
    pub fn new(submitter: &'a S, config: BatchConfig) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self {
            submitter,
            config,
            cancel: CancelHandle::new(),
        })
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn submit_batch<F>(
        &self,
        records: Vec<NormalizedTransaction>,
        mut on_status: F,
    ) -> Result<BatchStatus, BatchError>
    where
        F: FnMut(&BatchStatus),
    {
        let mut status = BatchStatus::new(records);
        tracing::info!(
            total = status.total,
            chunk_size = self.config.max_batch_size,
            "batch submission started"
        );
        let queue = (0..status.items.len()).collect();
        self.run(&mut status, queue, &mut on_status).await;
        Ok(status)
    }

    /// Resubmits only the failed items of a finished batch, each with a fresh
    /// attempt budget. Confirmed items are left alone.
    pub async fn retry_failed_transactions<F>(
        &self,
        previous: &BatchStatus,
        mut on_status: F,
    ) -> Result<BatchStatus, BatchError>
    where
        F: FnMut(&BatchStatus),
    {
        let mut status = previous.clone();
        let reset: VecDeque<usize> = status
            .items
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, item)| item.reset_for_retry().then_some(idx))
            .collect();
        if reset.is_empty() {
            return Err(BatchError::NothingToRetry);
        }
        status.recount();
        tracing::info!(retrying = reset.len(), "retrying failed transactions");
        self.run(&mut status, reset, &mut on_status).await;
        Ok(status)
    }

    /// Drives the queued items of `status` to a terminal state. The mutable
    /// borrow keeps a second run off the same batch while this one is active.
    async fn run<F>(&self, status: &mut BatchStatus, mut queue: VecDeque<usize>, on_status: &mut F)
    where
        F: FnMut(&BatchStatus),
    {
        status.is_processing = true;
        status.recount();
        on_status(&*status);

        let mut chunk_no = 0usize;

        'chunks: while !queue.is_empty() {
            if self.cancel.is_cancelled() {
                self.stop(status, on_status);
                break;
            }

            let take = queue.len().min(self.config.max_batch_size);
            let chunk: Vec<usize> = queue.drain(..take).collect();
            chunk_no += 1;
            tracing::debug!(chunk = chunk_no, size = chunk.len(), "submitting chunk");

            for &idx in &chunk {
                if status.items[idx].begin_submit() {
                    status.recount();
                    on_status(&*status);
                }
            }

            let gas_limit = self.config.gas_limit;
            let submitter = self.submitter;
            let mut in_flight: FuturesUnordered<_> = chunk
                .iter()
                .filter(|&&idx| status.items[idx].status == BatchItemStatus::Submitting)
                .map(|&idx| {
                    let record = status.items[idx].transaction.clone();
                    async move { (idx, submitter.submit(&record, gas_limit).await) }
                })
                .collect();

            let mut requeued = Vec::new();
            let mut terminal_failure = false;

            while let Some((idx, outcome)) = in_flight.next().await {
                if self.cancel.is_cancelled() {
                    self.stop(status, on_status);
                    break 'chunks;
                }

                let item = &mut status.items[idx];
                let changed = match outcome {
                    Ok(receipt) => {
                        tracing::debug!(id = %item.transaction.id, hash = %receipt.hash, "transaction confirmed");
                        item.confirm(receipt.hash)
                    }
                    Err(e) => {
                        let requeue = self.config.should_requeue(item.attempts);
                        tracing::warn!(
                            id = %item.transaction.id,
                            attempt = item.attempts + 1,
                            requeue,
                            "submission failed: {e}"
                        );
                        let changed = item.fail(e.to_string(), requeue);
                        if changed && requeue {
                            requeued.push(idx);
                        } else if changed {
                            terminal_failure = true;
                        }
                        changed
                    }
                };
                if changed {
                    status.recount();
                    on_status(&*status);
                }
            }

            // Retries ride in the next chunk, in batch order.
            requeued.sort_unstable();
            for idx in requeued.into_iter().rev() {
                queue.push_front(idx);
            }

            if terminal_failure && !self.config.allow_partial_import {
                let cancelled = status.cancel_open_items();
                tracing::warn!(cancelled, "partial import not allowed, cancelling remaining items");
                break;
            }
        }

        status.is_processing = false;
        status.recount();
        on_status(&*status);
        tracing::info!(
            confirmed = status.completed,
            failed = status.failed,
            pending = status.pending,
            "batch submission finished"
        );
    }

    fn stop<F>(&self, status: &mut BatchStatus, on_status: &mut F)
    where
        F: FnMut(&BatchStatus),
    {
        let cancelled = status.cancel_open_items();
        tracing::info!(cancelled, "batch cancelled");
        on_status(&*status);
    }
}

/// One-shot form of [`BatchOrchestrator::submit_batch`].
pub async fn submit_batch<S, F>(
    records: Vec<NormalizedTransaction>,
    config: &BatchConfig,
    submitter: &S,
    on_status: F,
) -> Result<BatchStatus, BatchError>
where
    S: Submitter + ?Sized,
    F: FnMut(&BatchStatus),
{
    BatchOrchestrator::new(submitter, config.clone())?
        .submit_batch(records, on_status)
        .await
}

/// One-shot form of [`BatchOrchestrator::retry_failed_transactions`].
pub async fn retry_failed_transactions<S, F>(
    status: &BatchStatus,
    config: &BatchConfig,
    submitter: &S,
    on_status: F,
) -> Result<BatchStatus, BatchError>
where
    S: Submitter + ?Sized,
    F: FnMut(&BatchStatus),
{
    BatchOrchestrator::new(submitter, config.clone())?
        .retry_failed_transactions(status, on_status)
        .await
}
