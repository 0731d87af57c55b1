use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::config::{
    FilingConfig, FilingEnvironment, TelemetryConfig, TransmitterConfig, TransportConfig,
    TransportMode,
};
use crate::filing::submission::domain::Submission;
use crate::filing::submission::repository::{
    ReceiptError, ReceiptSink, RepositoryError, SubmissionRepository,
};
use crate::filing::submission::service::FilingService;
use crate::filing::transport::{SdtmGateway, TransportError};
use crate::report::{
    IndividualParty, MailingAddress, PartyRole, PartySubject, PaymentMethod, PaymentSource,
    PersonIdentification, PropertyAddress, ReportId, ReportParty, ReportingPerson,
    TransactionReport,
};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 15, 30, 0).single().expect("valid timestamp")
}

pub(super) fn test_config() -> FilingConfig {
    FilingConfig {
        environment: FilingEnvironment::Sandbox,
        transmitter: TransmitterConfig {
            tax_id: "912223333".to_string(),
            transmitter_control_code: "TCCIGNORED".to_string(),
            legal_name: "Harbor Title & Escrow LLC".to_string(),
            contact_name: "Compliance Desk".to_string(),
            phone: "5155550100".to_string(),
            address: address("400 Walnut St", "Des Moines"),
        },
        transport: TransportConfig {
            mode: TransportMode::LocalDir,
            host: String::new(),
            port: 22,
            username: String::new(),
            password: None,
            private_key_path: None,
            submission_dir: "/sdtm-test/submissions".to_string(),
            response_dir: "/sdtm-test/responses".to_string(),
            timeout_secs: 5,
            local_root: std::path::PathBuf::from("./unused"),
        },
        telemetry: TelemetryConfig {
            log_level: "info".to_string(),
        },
        minimum_filing_date: NaiveDate::from_ymd_opt(2025, 12, 1).expect("valid date"),
    }
}

pub(super) fn address(street: &str, city: &str) -> MailingAddress {
    MailingAddress {
        street: street.to_string(),
        city: city.to_string(),
        state: "IA".to_string(),
        postal_code: "50309".to_string(),
        country: "US".to_string(),
    }
}

pub(super) fn individual(name: (&str, &str), ssn: &str) -> IndividualParty {
    IndividualParty {
        first_name: name.0.to_string(),
        last_name: name.1.to_string(),
        middle_name: None,
        birth_date: NaiveDate::from_ymd_opt(1984, 6, 15).expect("valid date"),
        address: address("12 Prairie Ln", "Ankeny"),
        phone: Some("5155550123".to_string()),
        identification: PersonIdentification::Ssn {
            number: ssn.to_string(),
        },
    }
}

pub(super) fn sample_report(id: &str) -> TransactionReport {
    TransactionReport {
        report_id: ReportId(id.to_string()),
        property: PropertyAddress {
            street: "901 Grand Ave".to_string(),
            city: "West Des Moines".to_string(),
            state: "IA".to_string(),
            postal_code: "50265".to_string(),
            county: Some("Polk".to_string()),
        },
        closing_date: NaiveDate::from_ymd_opt(2026, 1, 20).expect("valid date"),
        purchase_price: 450_000,
        reporting_person: ReportingPerson {
            legal_name: "Harbor Title & Escrow LLC".to_string(),
            tax_id: "912223333".to_string(),
            address: address("400 Walnut St", "Des Moines"),
            phone: Some("5155550100".to_string()),
        },
        parties: vec![
            ReportParty {
                role: PartyRole::Transferee,
                subject: PartySubject::Individual(individual(("Maya", "Okafor"), "453001122")),
            },
            ReportParty {
                role: PartyRole::Transferor,
                subject: PartySubject::Individual(individual(("Dale", "Rasmussen"), "480119933")),
            },
        ],
        payment_sources: vec![PaymentSource {
            amount: 450_000,
            method: PaymentMethod::WireTransfer,
            not_from_institution_account: false,
            institution: Some(crate::report::FinancialInstitution {
                legal_name: "Great Plains Bank".to_string(),
                tax_id: Some("420001111".to_string()),
                address: address("100 Locust St", "Des Moines"),
            }),
        }],
        receipt_identifier: None,
    }
}

/// How the fake gateway treats the next upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum UploadMode {
    Succeed,
    Transient,
    Ambiguous,
}

/// In-memory transport keyed by directory, recording every upload so tests
/// can assert on exactly-once delivery.
#[derive(Debug, Clone)]
pub(super) struct MemoryGateway {
    files: Arc<Mutex<HashMap<String, Vec<(String, Vec<u8>)>>>>,
    uploads: Arc<Mutex<Vec<String>>>,
    upload_mode: Arc<Mutex<UploadMode>>,
}

impl MemoryGateway {
    pub(super) fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
            upload_mode: Arc::new(Mutex::new(UploadMode::Succeed)),
        }
    }

    pub(super) fn set_upload_mode(&self, mode: UploadMode) {
        *self.upload_mode.lock().expect("mode mutex poisoned") = mode;
    }

    pub(super) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().expect("upload mutex poisoned").clone()
    }

    pub(super) fn place(&self, directory: &str, filename: &str, bytes: &[u8]) {
        let mut guard = self.files.lock().expect("files mutex poisoned");
        guard
            .entry(directory.to_string())
            .or_default()
            .push((filename.to_string(), bytes.to_vec()));
    }
}

impl SdtmGateway for MemoryGateway {
    fn upload(
        &self,
        directory: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let mode = *self.upload_mode.lock().expect("mode mutex poisoned");
        match mode {
            UploadMode::Succeed => {
                self.uploads
                    .lock()
                    .expect("upload mutex poisoned")
                    .push(filename.to_string());
                self.place(directory, filename, bytes);
                Ok(())
            }
            UploadMode::Transient => Err(TransportError::Backend {
                operation: "upload",
                detail: "connection reset by peer".to_string(),
            }),
            UploadMode::Ambiguous => Err(TransportError::AmbiguousUpload {
                filename: filename.to_string(),
            }),
        }
    }

    fn list(&self, directory: &str) -> Result<Vec<String>, TransportError> {
        let guard = self.files.lock().expect("files mutex poisoned");
        Ok(guard
            .get(directory)
            .map(|entries| entries.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }

    fn download(
        &self,
        directory: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let guard = self.files.lock().expect("files mutex poisoned");
        Ok(guard.get(directory).and_then(|entries| {
            entries
                .iter()
                .find(|(name, _)| name == filename)
                .map(|(_, bytes)| bytes.clone())
        }))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<ReportId, Submission>>>,
}

impl SubmissionRepository for MemoryRepository {
    fn insert(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&submission.report_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(submission.report_id.clone(), submission.clone());
        Ok(submission)
    }

    fn update(&self, submission: Submission) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&submission.report_id) {
            guard.insert(submission.report_id.clone(), submission);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, report_id: &ReportId) -> Result<Option<Submission>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(report_id).cloned())
    }

    fn due_for_poll(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut due: Vec<Submission> = guard
            .values()
            .filter(|submission| {
                submission.status == crate::filing::submission::SubmissionStatus::Submitted
                    && submission
                        .poll
                        .as_ref()
                        .map(|schedule| schedule.next_poll_at <= now)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.report_id.cmp(&b.report_id));
        due.truncate(limit);
        Ok(due)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    receipts: Arc<Mutex<Vec<(ReportId, String)>>>,
}

impl MemorySink {
    pub(super) fn receipts(&self) -> Vec<(ReportId, String)> {
        self.receipts.lock().expect("sink mutex poisoned").clone()
    }
}

impl ReceiptSink for MemorySink {
    fn record_receipt(&self, report_id: &ReportId, receipt: &str) -> Result<(), ReceiptError> {
        self.receipts
            .lock()
            .expect("sink mutex poisoned")
            .push((report_id.clone(), receipt.to_string()));
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) service: FilingService<MemoryRepository, MemorySink>,
    pub(super) repository: MemoryRepository,
    pub(super) gateway: MemoryGateway,
    pub(super) sink: MemorySink,
}

pub(super) fn build_harness() -> Harness {
    build_harness_with_config(test_config())
}

pub(super) fn build_harness_with_config(config: FilingConfig) -> Harness {
    let repository = MemoryRepository::default();
    let gateway = MemoryGateway::new();
    let sink = MemorySink::default();
    let service = FilingService::new(
        Arc::new(repository.clone()),
        Arc::new(sink.clone()),
        Box::new(gateway.clone()),
        config,
    );
    Harness {
        service,
        repository,
        gateway,
        sink,
    }
}

pub(super) fn status_message_xml(status: &str, errors: &[&str]) -> Vec<u8> {
    let mut xml = String::from("<EFilingSubmissionStatusXML>\n");
    xml.push_str(&format!(
        "  <SubmissionStatusCode>{status}</SubmissionStatusCode>\n"
    ));
    for error in errors {
        xml.push_str(&format!("  <StatusErrorText>{error}</StatusErrorText>\n"));
    }
    xml.push_str("</EFilingSubmissionStatusXML>\n");
    xml.into_bytes()
}

pub(super) fn acknowledgement_xml(entries: &[(u32, &str)]) -> Vec<u8> {
    let mut xml = String::from("<EFilingBatchAcknowledgementXML>\n");
    for (seq, receipt) in entries {
        xml.push_str("  <EFilingActivityXML>\n");
        xml.push_str(&format!(
            "    <ActivitySeqNumber>{seq}</ActivitySeqNumber>\n"
        ));
        xml.push_str(&format!(
            "    <ReceiptIdentifier>{receipt}</ReceiptIdentifier>\n"
        ));
        xml.push_str("  </EFilingActivityXML>\n");
    }
    xml.push_str("</EFilingBatchAcknowledgementXML>\n");
    xml.into_bytes()
}
