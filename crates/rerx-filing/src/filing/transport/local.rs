use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{SdtmGateway, TransportError};

/// Filesystem-backed transport mirroring the remote directory layout under a
/// local root. Stands in for the regulator endpoint in demos, staging, and
/// tests, selected by `SDTM_MODE=local`.
#[derive(Debug, Clone)]
pub struct DirectoryGateway {
    root: PathBuf,
}

impl DirectoryGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, directory: &str) -> PathBuf {
        self.root.join(directory.trim_start_matches('/'))
    }
}

impl SdtmGateway for DirectoryGateway {
    fn upload(
        &self,
        directory: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let dir = self.resolve(directory);
        fs::create_dir_all(&dir).map_err(|err| TransportError::Backend {
            operation: "upload",
            detail: format!("{}: {err}", dir.display()),
        })?;

        let path = dir.join(filename);
        fs::write(&path, bytes).map_err(|err| TransportError::Backend {
            operation: "upload",
            detail: format!("{}: {err}", path.display()),
        })?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "stored submission file");
        Ok(())
    }

    fn list(&self, directory: &str) -> Result<Vec<String>, TransportError> {
        let dir = self.resolve(directory);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(TransportError::Backend {
                    operation: "list",
                    detail: format!("{}: {err}", dir.display()),
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| TransportError::Backend {
                operation: "list",
                detail: format!("{}: {err}", dir.display()),
            })?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn download(
        &self,
        directory: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let path = self.resolve(directory).join(filename);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(TransportError::Backend {
                operation: "download",
                detail: format!("{}: {err}", path.display()),
            }),
        }
    }
}

impl DirectoryGateway {
    /// Convenience for tests and demos that stage regulator responses.
    pub fn place_response(
        &self,
        directory: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        self.upload(directory, filename, bytes)
    }
}
