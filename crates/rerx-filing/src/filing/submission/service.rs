use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::domain::{ArtifactKind, PollSchedule, StoredArtifact, Submission, SubmissionStatus};
use super::repository::{ReceiptError, ReceiptSink, RepositoryError, SubmissionRepository};
use crate::config::FilingConfig;
use crate::filing::codes;
use crate::filing::document::{DocumentBuilder, DocumentSummary};
use crate::filing::response::{self, ResponseStatus};
use crate::filing::transport::{SdtmGateway, TransportError};
use crate::report::{ReportId, TransactionReport};

/// Delay before the first poll after a successful upload.
const FIRST_POLL_DELAY_MINUTES: i64 = 10;

/// No response after this long escalates the submission for manual
/// follow-up.
const POLL_DEADLINE_DAYS: i64 = 5;

/// Widening delay between polls: minutes, then an hour, then hours, then a
/// steady half-day.
fn poll_delay(poll_attempts: u32) -> Duration {
    match poll_attempts {
        0 => Duration::minutes(FIRST_POLL_DELAY_MINUTES),
        1 => Duration::hours(1),
        2 => Duration::hours(4),
        _ => Duration::hours(12),
    }
}

/// Result of a `file()` invocation, mirrored onto the submission row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilingOutcome {
    /// A submission already past `queued` exists; nothing was re-sent.
    AlreadyFiled { status: SubmissionStatus },
    Submitted { filename: String },
    /// A previously ambiguous upload turned out to have been delivered;
    /// promoted without re-uploading.
    Reconciled { filename: String },
    /// The document failed preflight; nothing was transmitted.
    PreflightRejected { reason: String },
    /// Transport failed; the row stays `queued` for a clean retry.
    UploadFailed { reason: String, ambiguous: bool },
}

/// Result of a `poll()` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    NotPollable { status: SubmissionStatus },
    NoResponseYet { next_poll_at: DateTime<Utc> },
    Accepted { receipt: String },
    Rejected { errors: Vec<String> },
    NeedsReview { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FilingError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Receipt(#[from] ReceiptError),
    #[error("no submission exists for report {0}")]
    UnknownSubmission(ReportId),
    #[error("submission for report {0} was marked submitted without a filename")]
    MissingFilename(ReportId),
}

/// Orchestrates builder, transport, and response parsing over the durable
/// submission record. Assumes single-writer-per-submission; concurrent
/// invocations for the same report must be serialized by the repository.
pub struct FilingService<R, S> {
    repository: Arc<R>,
    receipts: Arc<S>,
    transport: Box<dyn SdtmGateway>,
    builder: DocumentBuilder,
}

impl<R, S> FilingService<R, S>
where
    R: SubmissionRepository + 'static,
    S: ReceiptSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        receipts: Arc<S>,
        transport: Box<dyn SdtmGateway>,
        config: FilingConfig,
    ) -> Self {
        Self {
            repository,
            receipts,
            transport,
            builder: DocumentBuilder::new(config),
        }
    }

    pub fn config(&self) -> &FilingConfig {
        self.builder.config()
    }

    /// Idempotent entry point: bring the report's submission to
    /// `submitted` or record why that is not possible. Never uploads the
    /// same report twice.
    pub fn file(
        &self,
        report: &TransactionReport,
        now: DateTime<Utc>,
    ) -> Result<FilingOutcome, FilingError> {
        let mut submission = match self.repository.fetch(&report.report_id)? {
            Some(existing) if existing.status != SubmissionStatus::Queued
                && existing.status != SubmissionStatus::NeedsReview =>
            {
                info!(
                    report_id = %report.report_id,
                    status = existing.status.label(),
                    "submission already filed, skipping"
                );
                return Ok(FilingOutcome::AlreadyFiled {
                    status: existing.status,
                });
            }
            Some(existing) => existing,
            None => self
                .repository
                .insert(Submission::new(report.report_id.clone(), now))?,
        };

        if submission.ambiguous_upload {
            if let Some(outcome) = self.reconcile_ambiguous_upload(&mut submission, now)? {
                return Ok(outcome);
            }
        }

        let built = match self
            .builder
            .build(report, 1, now.date_naive(), now.date_naive())
        {
            Ok(built) => built,
            Err(preflight) => {
                let reason = preflight.to_string();
                warn!(report_id = %report.report_id, %reason, "preflight failed");
                submission.status = SubmissionStatus::NeedsReview;
                submission.attempts += 1;
                submission.errors.push(reason.clone());
                submission.updated_at = now;
                self.repository.update(submission)?;
                return Ok(FilingOutcome::PreflightRejected { reason });
            }
        };

        let filename = self.generate_filename(now);
        submission.filename = Some(filename.clone());
        submission.activity_seq = Some(built.summary.activity_seq);
        submission.attempts += 1;
        submission.artifacts.push(StoredArtifact::capture(
            ArtifactKind::OutboundDocument,
            &filename,
            built.xml.as_bytes(),
            now,
        ));

        log_document_summary(&report.report_id, &built.summary);

        let submission_dir = &self.config().transport.submission_dir;
        match self
            .transport
            .upload(submission_dir, &filename, built.xml.as_bytes())
        {
            Ok(()) => {
                submission.status = SubmissionStatus::Submitted;
                submission.poll = Some(PollSchedule {
                    submitted_at: now,
                    next_poll_at: now + poll_delay(0),
                    poll_attempts: 0,
                });
                submission.updated_at = now;
                self.repository.update(submission)?;
                info!(report_id = %report.report_id, %filename, "submission uploaded");
                Ok(FilingOutcome::Submitted { filename })
            }
            Err(err) => {
                let ambiguous = matches!(err, TransportError::AmbiguousUpload { .. });
                let reason = err.to_string();
                warn!(report_id = %report.report_id, %reason, ambiguous, "upload failed");
                submission.ambiguous_upload = ambiguous;
                submission.errors.push(reason.clone());
                submission.updated_at = now;
                self.repository.update(submission)?;
                Ok(FilingOutcome::UploadFailed { reason, ambiguous })
            }
        }
    }

    /// A timed-out upload may still have been delivered. Before any
    /// re-upload, look for response files named after the stored filename;
    /// their existence proves delivery.
    fn reconcile_ambiguous_upload(
        &self,
        submission: &mut Submission,
        now: DateTime<Utc>,
    ) -> Result<Option<FilingOutcome>, FilingError> {
        let Some(filename) = submission.filename.clone() else {
            submission.ambiguous_upload = false;
            return Ok(None);
        };

        let response_dir = &self.config().transport.response_dir;
        let names = self.transport.list(response_dir)?;
        let delivered = names.iter().any(|name| {
            name == &format!("{filename}{}", codes::STATUS_MESSAGE_SUFFIX)
                || name == &format!("{filename}{}", codes::ACKNOWLEDGEMENT_SUFFIX)
        });

        if !delivered {
            // Nothing on the remote side references the filename; the
            // upload is treated as undelivered and rebuilt below.
            submission.ambiguous_upload = false;
            return Ok(None);
        }

        info!(
            report_id = %submission.report_id,
            %filename,
            "ambiguous upload reconciled as delivered"
        );
        submission.ambiguous_upload = false;
        submission.status = SubmissionStatus::Submitted;
        submission.poll = Some(PollSchedule {
            submitted_at: now,
            next_poll_at: now,
            poll_attempts: 0,
        });
        submission.updated_at = now;
        self.repository.update(submission.clone())?;
        Ok(Some(FilingOutcome::Reconciled { filename }))
    }

    /// Check for regulator responses and advance the state machine.
    pub fn poll(
        &self,
        report_id: &ReportId,
        now: DateTime<Utc>,
    ) -> Result<PollOutcome, FilingError> {
        let mut submission = self
            .repository
            .fetch(report_id)?
            .ok_or_else(|| FilingError::UnknownSubmission(report_id.clone()))?;

        if submission.status != SubmissionStatus::Submitted {
            return Ok(PollOutcome::NotPollable {
                status: submission.status,
            });
        }

        let filename = submission
            .filename
            .clone()
            .ok_or_else(|| FilingError::MissingFilename(report_id.clone()))?;
        let response_dir = self.config().transport.response_dir.clone();

        if !submission.has_artifact(ArtifactKind::StatusMessage) {
            let status_name = format!("{filename}{}", codes::STATUS_MESSAGE_SUFFIX);
            if let Some(bytes) = self.transport.download(&response_dir, &status_name)? {
                submission.artifacts.push(StoredArtifact::capture(
                    ArtifactKind::StatusMessage,
                    &status_name,
                    &bytes,
                    now,
                ));

                match response::parse_status_message(&bytes) {
                    Ok(message) => {
                        submission.last_response_status =
                            Some(message.status.label().to_string());
                        match message.status {
                            ResponseStatus::Rejected => {
                                submission.status = SubmissionStatus::Rejected;
                                submission.errors.extend(message.errors.clone());
                                submission.updated_at = now;
                                self.repository.update(submission)?;
                                info!(%report_id, "regulator rejected submission");
                                return Ok(PollOutcome::Rejected {
                                    errors: message.errors,
                                });
                            }
                            ResponseStatus::AcceptedWithWarnings => {
                                let reason =
                                    "regulator accepted with warnings; review required"
                                        .to_string();
                                submission.status = SubmissionStatus::NeedsReview;
                                submission.errors.extend(message.errors);
                                submission.errors.push(reason.clone());
                                submission.updated_at = now;
                                self.repository.update(submission)?;
                                return Ok(PollOutcome::NeedsReview { reason });
                            }
                            ResponseStatus::Accepted => {
                                // Clean status; acceptance still waits on the
                                // acknowledgement and its receipt identifier.
                            }
                        }
                    }
                    Err(err) => {
                        return self.escalate(
                            submission,
                            now,
                            format!("unreadable status message: {err}"),
                        );
                    }
                }
            }
        }

        let ack_name = format!("{filename}{}", codes::ACKNOWLEDGEMENT_SUFFIX);
        if let Some(bytes) = self.transport.download(&response_dir, &ack_name)? {
            submission.artifacts.push(StoredArtifact::capture(
                ArtifactKind::Acknowledgement,
                &ack_name,
                &bytes,
                now,
            ));

            match response::parse_acknowledgement(&bytes) {
                Ok(ack) => {
                    let seq = submission.activity_seq.unwrap_or(1);
                    match ack.receipts.get(&seq) {
                        Some(receipt) => {
                            submission.status = SubmissionStatus::Accepted;
                            submission.receipt_identifier = Some(receipt.clone());
                            submission.poll = None;
                            submission.updated_at = now;
                            self.receipts.record_receipt(report_id, receipt)?;
                            self.repository.update(submission)?;
                            info!(%report_id, %receipt, "submission accepted");
                            return Ok(PollOutcome::Accepted {
                                receipt: receipt.clone(),
                            });
                        }
                        None => {
                            return self.escalate(
                                submission,
                                now,
                                format!(
                                    "acknowledgement does not cover activity {seq}"
                                ),
                            );
                        }
                    }
                }
                Err(err) => {
                    return self.escalate(
                        submission,
                        now,
                        format!("unreadable acknowledgement: {err}"),
                    );
                }
            }
        }

        let schedule = submission.poll.clone().unwrap_or(PollSchedule {
            submitted_at: now,
            next_poll_at: now,
            poll_attempts: 0,
        });

        if now - schedule.submitted_at >= Duration::days(POLL_DEADLINE_DAYS) {
            return self.escalate(
                submission,
                now,
                format!("no regulator response within {POLL_DEADLINE_DAYS} days of upload"),
            );
        }

        let poll_attempts = schedule.poll_attempts + 1;
        let next_poll_at = now + poll_delay(poll_attempts);
        submission.poll = Some(PollSchedule {
            submitted_at: schedule.submitted_at,
            next_poll_at,
            poll_attempts,
        });
        submission.updated_at = now;
        self.repository.update(submission)?;
        Ok(PollOutcome::NoResponseYet { next_poll_at })
    }

    /// Poller entry point: process every submission whose next-poll time
    /// has elapsed. Each report is independent; a failure on one does not
    /// stop the batch.
    pub fn poll_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(ReportId, Result<PollOutcome, FilingError>)>, FilingError> {
        let due = self.repository.due_for_poll(now, limit)?;
        let mut outcomes = Vec::with_capacity(due.len());
        for submission in due {
            let report_id = submission.report_id.clone();
            let outcome = self.poll(&report_id, now);
            if let Err(err) = &outcome {
                warn!(%report_id, error = %err, "poll failed");
            }
            outcomes.push((report_id, outcome));
        }
        Ok(outcomes)
    }

    fn escalate(
        &self,
        mut submission: Submission,
        now: DateTime<Utc>,
        reason: String,
    ) -> Result<PollOutcome, FilingError> {
        warn!(report_id = %submission.report_id, %reason, "submission escalated for review");
        submission.status = SubmissionStatus::NeedsReview;
        submission.errors.push(reason.clone());
        submission.updated_at = now;
        self.repository.update(submission)?;
        Ok(PollOutcome::NeedsReview { reason })
    }

    /// `<form prefix>.<timestamp>.<transmitting identity>.xml`, the fixed
    /// convention response files are keyed off.
    fn generate_filename(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}.{}.{}.xml",
            codes::FORM_TYPE_CODE,
            now.format("%Y%m%d%H%M%S"),
            self.config().effective_control_code()
        )
    }
}

fn log_document_summary(report_id: &ReportId, summary: &DocumentSummary) {
    info!(
        %report_id,
        activity_seq = summary.activity_seq,
        transferees = summary.transferees,
        transferors = summary.transferors,
        associated_persons = summary.associated_persons,
        payment_details = summary.payment_details,
        total_amount = summary.total_amount,
        "document built"
    );
}
