//! File transport to and from the regulator's SDTM endpoint.

mod local;
mod sftp;

use std::fmt::Debug;
use std::time::Duration;

pub use local::DirectoryGateway;
pub use sftp::SftpGateway;

/// Narrow surface the lifecycle manager uses to move files. Two
/// implementations exist: the ssh2-backed [`SftpGateway`] for the real
/// endpoint and [`DirectoryGateway`] for demos, staging, and tests. Which
/// one runs is decided once at startup from configuration.
pub trait SdtmGateway: Debug + Send + Sync {
    /// Place `bytes` in `directory` under `filename`. An error never means
    /// "definitely not delivered"; see [`TransportError::AmbiguousUpload`].
    fn upload(&self, directory: &str, filename: &str, bytes: &[u8])
        -> Result<(), TransportError>;

    /// Names of the files currently present in `directory`.
    fn list(&self, directory: &str) -> Result<Vec<String>, TransportError>;

    /// Fetch a file, or `None` if the remote side has not produced it yet.
    fn download(&self, directory: &str, filename: &str)
        -> Result<Option<Vec<u8>>, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unable to reach SDTM endpoint: {0}")]
    Connect(String),
    #[error("SDTM authentication failed: {0}")]
    Authentication(String),
    #[error("SDTM {operation} failed: {detail}")]
    Backend {
        operation: &'static str,
        detail: String,
    },
    #[error("SDTM {operation} timed out")]
    Timeout { operation: &'static str },
    #[error("upload of '{filename}' timed out; delivery is unknown and must be reconciled against the response directory before any re-upload")]
    AmbiguousUpload { filename: String },
}

impl TransportError {
    /// Whether retrying the same operation can help. Authentication and
    /// ambiguous-upload failures are terminal for the attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_)
                | TransportError::Backend { .. }
                | TransportError::Timeout { .. }
        )
    }
}

/// Bounded retry with a short linear backoff, applied to transient
/// transport failures only.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn run<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut last_error = None;
        for round in 1..=self.attempts.max(1) {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && round < self.attempts => {
                    tracing::warn!(operation, round, error = %err, "transient SDTM failure, retrying");
                    std::thread::sleep(self.backoff * round);
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error.unwrap_or(TransportError::Timeout { operation }))
    }
}

/// Join a remote directory and filename without doubling separators.
pub(crate) fn remote_path(directory: &str, filename: &str) -> String {
    let trimmed = directory.trim_end_matches('/');
    format!("{trimmed}/{filename}")
}
