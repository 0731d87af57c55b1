use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::report::MailingAddress;

/// Distinguishes the regulator endpoint and filing rules per deployment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingEnvironment {
    Sandbox,
    Production,
}

impl FilingEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            _ => Self::Sandbox,
        }
    }

    pub const fn is_production(self) -> bool {
        matches!(self, FilingEnvironment::Production)
    }
}

/// Which transport implementation to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Authenticated SFTP against the regulator endpoint.
    Sftp,
    /// Local directory tree standing in for the remote endpoint.
    LocalDir,
}

impl TransportMode {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "sftp" => Self::Sftp,
            _ => Self::LocalDir,
        }
    }
}

/// Top-level configuration for the filing pipeline, read once at startup.
#[derive(Debug, Clone)]
pub struct FilingConfig {
    pub environment: FilingEnvironment,
    pub transmitter: TransmitterConfig,
    pub transport: TransportConfig,
    pub telemetry: TelemetryConfig,
    /// Reports with a filing date earlier than this are rejected in preflight.
    pub minimum_filing_date: NaiveDate,
}

/// The filer's registered transmitting identity. Never sourced from
/// transaction data.
#[derive(Debug, Clone)]
pub struct TransmitterConfig {
    pub tax_id: String,
    pub transmitter_control_code: String,
    pub legal_name: String,
    pub contact_name: String,
    pub phone: String,
    pub address: MailingAddress,
}

/// SDTM endpoint selection, credentials, and remote directory layout.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub submission_dir: String,
    pub response_dir: String,
    pub timeout_secs: u64,
    /// Root for [`TransportMode::LocalDir`]; ignored for SFTP.
    pub local_root: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

const DEFAULT_MINIMUM_FILING_DATE: &str = "2025-12-01";

impl FilingConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = FilingEnvironment::from_str(
            &env::var("FILING_ENV").unwrap_or_else(|_| "sandbox".to_string()),
        );

        let minimum_filing_date = parse_date_var(
            "MINIMUM_FILING_DATE",
            &env::var("MINIMUM_FILING_DATE")
                .unwrap_or_else(|_| DEFAULT_MINIMUM_FILING_DATE.to_string()),
        )?;

        let transmitter = TransmitterConfig {
            tax_id: env::var("TRANSMITTER_TIN").unwrap_or_default(),
            transmitter_control_code: env::var("TRANSMITTER_TCC").unwrap_or_default(),
            legal_name: env::var("TRANSMITTER_NAME").unwrap_or_default(),
            contact_name: env::var("TRANSMITTER_CONTACT_NAME").unwrap_or_default(),
            phone: env::var("TRANSMITTER_PHONE").unwrap_or_default(),
            address: MailingAddress {
                street: env::var("TRANSMITTER_STREET").unwrap_or_default(),
                city: env::var("TRANSMITTER_CITY").unwrap_or_default(),
                state: env::var("TRANSMITTER_STATE").unwrap_or_default(),
                postal_code: env::var("TRANSMITTER_POSTAL_CODE").unwrap_or_default(),
                country: env::var("TRANSMITTER_COUNTRY").unwrap_or_else(|_| "US".to_string()),
            },
        };

        let (default_submission_dir, default_response_dir) = match environment {
            FilingEnvironment::Sandbox => ("/sdtm-test/submissions", "/sdtm-test/responses"),
            FilingEnvironment::Production => ("/sdtm/submissions", "/sdtm/responses"),
        };

        let port = env::var("SDTM_PORT")
            .unwrap_or_else(|_| "22".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let timeout_secs = env::var("SDTM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let transport = TransportConfig {
            mode: TransportMode::from_str(
                &env::var("SDTM_MODE").unwrap_or_else(|_| "local".to_string()),
            ),
            host: env::var("SDTM_HOST").unwrap_or_default(),
            port,
            username: env::var("SDTM_USERNAME").unwrap_or_default(),
            password: env::var("SDTM_PASSWORD").ok(),
            private_key_path: env::var("SDTM_PRIVATE_KEY").ok().map(PathBuf::from),
            submission_dir: env::var("SDTM_SUBMISSION_DIR")
                .unwrap_or_else(|_| default_submission_dir.to_string()),
            response_dir: env::var("SDTM_RESPONSE_DIR")
                .unwrap_or_else(|_| default_response_dir.to_string()),
            timeout_secs,
            local_root: env::var("SDTM_LOCAL_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./sdtm")),
        };

        let telemetry = TelemetryConfig {
            log_level: env::var("FILING_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            environment,
            transmitter,
            transport,
            telemetry,
            minimum_filing_date,
        })
    }

    /// The transmitter control code actually placed on the wire. Outside
    /// production the sandbox literal is forced regardless of configuration.
    pub fn effective_control_code(&self) -> &str {
        if self.environment.is_production() {
            &self.transmitter.transmitter_control_code
        } else {
            crate::filing::codes::SANDBOX_TRANSMITTER_CONTROL_CODE
        }
    }
}

fn parse_date_var(name: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        name,
        value: value.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SDTM_PORT must be a valid u16")]
    InvalidPort,
    #[error("SDTM_TIMEOUT_SECS must be a positive integer of seconds")]
    InvalidTimeout,
    #[error("{name} must be a YYYY-MM-DD date, got '{value}'")]
    InvalidDate { name: &'static str, value: String },
}
