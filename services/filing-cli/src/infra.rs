use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rerx_filing::config::{FilingConfig, TransportMode};
use rerx_filing::filing::submission::{
    ReceiptError, ReceiptSink, RepositoryError, Submission, SubmissionRepository,
    SubmissionStatus,
};
use rerx_filing::filing::transport::{DirectoryGateway, SdtmGateway, SftpGateway};
use rerx_filing::report::ReportId;

/// Build the transport implementation the configuration asks for.
pub(crate) fn select_gateway(config: &FilingConfig) -> Box<dyn SdtmGateway> {
    match config.transport.mode {
        TransportMode::Sftp => Box::new(SftpGateway::new(config.transport.clone())),
        TransportMode::LocalDir => {
            Box::new(DirectoryGateway::new(config.transport.local_root.clone()))
        }
    }
}

/// Durable submission store: one JSON document per report under
/// `<store>/submissions/`. The report-id-derived filename is the uniqueness
/// guarantee; `insert` refuses to overwrite an existing row.
#[derive(Debug, Clone)]
pub(crate) struct JsonFileSubmissionRepository {
    dir: PathBuf,
}

impl JsonFileSubmissionRepository {
    pub(crate) fn open(store: &Path) -> Result<Self, RepositoryError> {
        let dir = store.join("submissions");
        fs::create_dir_all(&dir)
            .map_err(|err| RepositoryError::Unavailable(format!("{}: {err}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, report_id: &ReportId) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(&report_id.0)))
    }

    fn write(&self, path: &Path, submission: &Submission) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(submission)
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|err| RepositoryError::Unavailable(format!("{}: {err}", path.display())))
    }

    fn read(&self, path: &Path) -> Result<Option<Submission>, RepositoryError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(RepositoryError::Unavailable(format!(
                    "{}: {err}",
                    path.display()
                )))
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| RepositoryError::Unavailable(format!("{}: {err}", path.display())))
    }
}

impl SubmissionRepository for JsonFileSubmissionRepository {
    fn insert(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let path = self.path_for(&submission.report_id);
        if path.exists() {
            return Err(RepositoryError::Conflict);
        }
        self.write(&path, &submission)?;
        Ok(submission)
    }

    fn update(&self, submission: Submission) -> Result<(), RepositoryError> {
        let path = self.path_for(&submission.report_id);
        if !path.exists() {
            return Err(RepositoryError::NotFound);
        }
        self.write(&path, &submission)
    }

    fn fetch(&self, report_id: &ReportId) -> Result<Option<Submission>, RepositoryError> {
        self.read(&self.path_for(report_id))
    }

    fn due_for_poll(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let entries = fs::read_dir(&self.dir).map_err(|err| {
            RepositoryError::Unavailable(format!("{}: {err}", self.dir.display()))
        })?;

        let mut due = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                RepositoryError::Unavailable(format!("{}: {err}", self.dir.display()))
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(submission) = self.read(&path)? {
                let elapsed = submission
                    .poll
                    .as_ref()
                    .map(|schedule| schedule.next_poll_at <= now)
                    .unwrap_or(false);
                if submission.status == SubmissionStatus::Submitted && elapsed {
                    due.push(submission);
                }
            }
        }

        due.sort_by(|a, b| a.report_id.cmp(&b.report_id));
        due.truncate(limit);
        Ok(due)
    }
}

/// Receipt write-back for the CLI: receipts land in `<store>/receipts.json`
/// keyed by report id, where the intake side picks them up.
#[derive(Debug, Clone)]
pub(crate) struct JsonFileReceiptSink {
    path: PathBuf,
}

impl JsonFileReceiptSink {
    pub(crate) fn open(store: &Path) -> Self {
        Self {
            path: store.join("receipts.json"),
        }
    }
}

impl ReceiptSink for JsonFileReceiptSink {
    fn record_receipt(&self, report_id: &ReportId, receipt: &str) -> Result<(), ReceiptError> {
        let mut receipts: HashMap<String, String> = match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| ReceiptError::Unavailable(err.to_string()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(ReceiptError::Unavailable(err.to_string())),
        };

        receipts.insert(report_id.0.clone(), receipt.to_string());
        let json = serde_json::to_vec_pretty(&receipts)
            .map_err(|err| ReceiptError::Unavailable(err.to_string()))?;
        fs::write(&self.path, json).map_err(|err| ReceiptError::Unavailable(err.to_string()))
    }
}

/// Exclusive per-report lock held for the duration of a `file` or `poll`
/// mutation. Serializes concurrent invocations for the same report across
/// processes; different reports proceed independently.
pub(crate) struct ReportLock {
    path: PathBuf,
}

impl ReportLock {
    pub(crate) fn acquire(store: &Path, report_id: &ReportId) -> Result<Self, RepositoryError> {
        let dir = store.join("locks");
        fs::create_dir_all(&dir)
            .map_err(|err| RepositoryError::Unavailable(format!("{}: {err}", dir.display())))?;
        let path = dir.join(format!("{}.lock", sanitize(&report_id.0)));

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(Self { path }),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(
                RepositoryError::Unavailable(format!(
                    "report {} is locked by another invocation ({})",
                    report_id,
                    path.display()
                )),
            ),
            Err(err) => Err(RepositoryError::Unavailable(format!(
                "{}: {err}",
                path.display()
            ))),
        }
    }
}

impl Drop for ReportLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
