//! Durable submission lifecycle: one record per report, a small state
//! machine over it, and the orchestration of builder, transport, and
//! response parsing.

pub mod domain;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ArtifactError, ArtifactKind, PollSchedule, StoredArtifact, Submission, SubmissionStatus,
};
pub use repository::{ReceiptError, ReceiptSink, RepositoryError, SubmissionRepository};
pub use service::{FilingError, FilingOutcome, FilingService, PollOutcome};
