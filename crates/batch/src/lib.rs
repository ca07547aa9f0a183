pub mod config;
pub mod orchestrator;
pub mod pipeline;
pub mod status;
pub mod submitter;

pub use config::{BatchConfig, ConfigError};
pub use orchestrator::{
    retry_failed_transactions, submit_batch, BatchError, BatchOrchestrator, CancelHandle,
};
pub use pipeline::{ImportOutcome, ImportPipeline};
pub use status::{
    cancel_batch_processing, get_batch_summary, BatchItem, BatchItemStatus, BatchStatus,
    BatchSummary,
};
pub use submitter::{MockSubmitter, SubmitError, SubmitReceipt, Submitter};
