use chrono::{DateTime, Utc};

use super::domain::Submission;
use crate::report::ReportId;

/// Storage abstraction for submissions. Implementations own the two
/// guarantees the state machine leans on: at most one row per report
/// (`insert` conflicts on a duplicate) and serialized mutation of any one
/// row; the poller runs as a separately scheduled process, so in-process
/// coordination alone is not enough.
pub trait SubmissionRepository: Send + Sync {
    fn insert(&self, submission: Submission) -> Result<Submission, RepositoryError>;
    fn update(&self, submission: Submission) -> Result<(), RepositoryError>;
    fn fetch(&self, report_id: &ReportId) -> Result<Option<Submission>, RepositoryError>;
    /// Submissions in `submitted` state whose next-poll time has elapsed.
    fn due_for_poll(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("a submission already exists for this report")]
    Conflict,
    #[error("submission not found")]
    NotFound,
    #[error("submission store unavailable: {0}")]
    Unavailable(String),
}

/// Write-back hook for the receipt identifier the regulator assigns on
/// acceptance. The transaction report itself is owned by the intake side;
/// this is the pipeline's only write against it.
pub trait ReceiptSink: Send + Sync {
    fn record_receipt(&self, report_id: &ReportId, receipt: &str) -> Result<(), ReceiptError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("unable to record receipt identifier: {0}")]
    Unavailable(String),
}
