use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::report::ReportId;

/// Lifecycle of one submission. `NeedsReview` is re-enterable: after the
/// underlying data is corrected, `file()` runs a fresh attempt on the same
/// row. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Queued,
    Submitted,
    Accepted,
    Rejected,
    NeedsReview,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::NeedsReview => "needs_review",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, SubmissionStatus::Accepted | SubmissionStatus::Rejected)
    }
}

/// What a stored artifact is a copy of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    OutboundDocument,
    StatusMessage,
    Acknowledgement,
}

/// Checksummed, base64-encoded copy of a file that crossed the wire in
/// either direction. Kept on the submission so an operator can audit
/// exactly what was sent and received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub kind: ArtifactKind,
    pub filename: String,
    pub sha256_hex: String,
    pub content_base64: String,
    pub stored_at: DateTime<Utc>,
}

impl StoredArtifact {
    pub fn capture(
        kind: ArtifactKind,
        filename: &str,
        bytes: &[u8],
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            filename: filename.to_string(),
            sha256_hex: sha256_hex(bytes),
            content_base64: BASE64.encode(bytes),
            stored_at,
        }
    }

    /// Decode the stored payload, verifying it still matches its checksum.
    pub fn decode(&self) -> Result<Vec<u8>, ArtifactError> {
        let bytes = BASE64
            .decode(&self.content_base64)
            .map_err(|_| ArtifactError::Encoding)?;
        let actual = sha256_hex(&bytes);
        if actual != self.sha256_hex {
            return Err(ArtifactError::ChecksumMismatch {
                expected: self.sha256_hex.clone(),
                actual,
            });
        }
        Ok(bytes)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact payload is not valid base64")]
    Encoding,
    #[error("artifact checksum mismatch (expected {expected}, computed {actual})")]
    ChecksumMismatch { expected: String, actual: String },
}

/// When polling started and when it should next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSchedule {
    pub submitted_at: DateTime<Utc>,
    pub next_poll_at: DateTime<Utc>,
    pub poll_attempts: u32,
}

/// The durable record: exactly one per transaction report. Retries mutate
/// this row; it is never deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub report_id: ReportId,
    pub status: SubmissionStatus,
    /// Filing attempts, counting preflight and transport failures.
    pub attempts: u32,
    pub filename: Option<String>,
    /// Sequence number the builder assigned to this report's activity;
    /// acknowledgements are reconciled against it.
    pub activity_seq: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollSchedule>,
    pub artifacts: Vec<StoredArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response_status: Option<String>,
    /// Human-readable reasons for the current status, newest last.
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_identifier: Option<String>,
    /// Set when an upload timed out and delivery is unknown; cleared once
    /// reconciled against the response directory.
    #[serde(default)]
    pub ambiguous_upload: bool,
}

impl Submission {
    pub fn new(report_id: ReportId, now: DateTime<Utc>) -> Self {
        Self {
            report_id,
            status: SubmissionStatus::Queued,
            attempts: 0,
            filename: None,
            activity_seq: None,
            created_at: now,
            updated_at: now,
            poll: None,
            artifacts: Vec::new(),
            last_response_status: None,
            errors: Vec::new(),
            receipt_identifier: None,
            ambiguous_upload: false,
        }
    }

    pub fn has_artifact(&self, kind: ArtifactKind) -> bool {
        self.artifacts.iter().any(|artifact| artifact.kind == kind)
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::new(), |mut acc, b| {
        let _ = write!(acc, "{:02x}", b);
        acc
    })
}
