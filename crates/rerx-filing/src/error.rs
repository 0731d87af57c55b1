use crate::config::ConfigError;
use crate::filing::document::{PreflightError, StructureError};
use crate::filing::submission::FilingError;
use crate::telemetry::TelemetryError;
use std::fmt;

/// Aggregate error for binaries built on the pipeline.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Preflight(PreflightError),
    Structure(StructureError),
    Filing(FilingError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Json(err) => write!(f, "json error: {}", err),
            AppError::Preflight(err) => write!(f, "preflight error: {}", err),
            AppError::Structure(err) => write!(f, "document structure error: {}", err),
            AppError::Filing(err) => write!(f, "filing error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Preflight(err) => Some(err),
            AppError::Structure(err) => Some(err),
            AppError::Filing(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<PreflightError> for AppError {
    fn from(value: PreflightError) -> Self {
        Self::Preflight(value)
    }
}

impl From<StructureError> for AppError {
    fn from(value: StructureError) -> Self {
        Self::Structure(value)
    }
}

impl From<FilingError> for AppError {
    fn from(value: FilingError) -> Self {
        Self::Filing(value)
    }
}
