use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use ssh2::{ErrorCode, Session, Sftp};

use super::{remote_path, RetryPolicy, SdtmGateway, TransportError};
use crate::config::TransportConfig;

/// Authenticated SFTP client for the regulator endpoint. Every operation is
/// blocking, bounded by the configured timeout, and opens a fresh session;
/// the regulator's SDTM gateway drops idle connections aggressively, so
/// there is nothing to gain from pooling.
pub struct SftpGateway {
    config: TransportConfig,
    retry: RetryPolicy,
}

impl SftpGateway {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(config: TransportConfig, retry: RetryPolicy) -> Self {
        Self { config, retry }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    fn connect(&self) -> Result<Sftp, TransportError> {
        let timeout = self.timeout();
        let address = format!("{}:{}", self.config.host, self.config.port);
        let resolved = address
            .to_socket_addrs()
            .map_err(|err| TransportError::Connect(format!("{address}: {err}")))?
            .next()
            .ok_or_else(|| {
                TransportError::Connect(format!("{address}: no address resolved"))
            })?;

        let stream = TcpStream::connect_timeout(&resolved, timeout)
            .map_err(|err| TransportError::Connect(format!("{address}: {err}")))?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| stream.set_write_timeout(Some(timeout)))
            .map_err(|err| TransportError::Connect(format!("{address}: {err}")))?;

        let mut session = Session::new()
            .map_err(|err| TransportError::Connect(format!("session init: {err}")))?;
        session.set_tcp_stream(stream);
        session
            .handshake()
            .map_err(|err| TransportError::Connect(format!("handshake: {err}")))?;
        session.set_timeout(timeout.as_millis().min(u64::from(u32::MAX) as u128) as u32);

        self.authenticate(&session)?;

        session
            .sftp()
            .map_err(|err| TransportError::Connect(format!("sftp channel: {err}")))
    }

    fn authenticate(&self, session: &Session) -> Result<(), TransportError> {
        if let Some(key_path) = &self.config.private_key_path {
            return session
                .userauth_pubkey_file(&self.config.username, None, key_path, None)
                .map_err(|err| TransportError::Authentication(err.to_string()));
        }
        if let Some(password) = &self.config.password {
            return session
                .userauth_password(&self.config.username, password)
                .map_err(|err| TransportError::Authentication(err.to_string()));
        }
        Err(TransportError::Authentication(
            "no SDTM password or private key configured".to_string(),
        ))
    }
}

impl std::fmt::Debug for SftpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpGateway")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("username", &self.config.username)
            .finish_non_exhaustive()
    }
}

impl SdtmGateway for SftpGateway {
    fn upload(
        &self,
        directory: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        // Connecting is retriable; once bytes start flowing, a failure can
        // no longer be assumed undelivered and must surface as ambiguous.
        let sftp = self.retry.run("connect", || self.connect())?;

        let path = remote_path(directory, filename);
        let mut remote = sftp.create(Path::new(&path)).map_err(|err| {
            TransportError::Backend {
                operation: "upload",
                detail: format!("{path}: {err}"),
            }
        })?;

        remote
            .write_all(bytes)
            .and_then(|_| remote.flush())
            .map_err(|err| {
                if is_timeout(&err) {
                    TransportError::AmbiguousUpload {
                        filename: filename.to_string(),
                    }
                } else {
                    TransportError::Backend {
                        operation: "upload",
                        detail: format!("{path}: {err}"),
                    }
                }
            })?;

        tracing::info!(%path, bytes = bytes.len(), "uploaded submission file");
        Ok(())
    }

    fn list(&self, directory: &str) -> Result<Vec<String>, TransportError> {
        self.retry.run("list", || {
            let sftp = self.connect()?;
            let entries =
                sftp.readdir(Path::new(directory))
                    .map_err(|err| TransportError::Backend {
                        operation: "list",
                        detail: format!("{directory}: {err}"),
                    })?;

            Ok(entries
                .into_iter()
                .filter_map(|(path, _stat)| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                })
                .collect())
        })
    }

    fn download(
        &self,
        directory: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        self.retry.run("download", || {
            let sftp = self.connect()?;
            let path = remote_path(directory, filename);

            let mut remote = match sftp.open(Path::new(&path)) {
                Ok(file) => file,
                Err(err) if is_no_such_file(&err) => return Ok(None),
                Err(err) => {
                    return Err(TransportError::Backend {
                        operation: "download",
                        detail: format!("{path}: {err}"),
                    })
                }
            };

            let mut bytes = Vec::new();
            remote
                .read_to_end(&mut bytes)
                .map_err(|err| TransportError::Backend {
                    operation: "download",
                    detail: format!("{path}: {err}"),
                })?;

            tracing::debug!(%path, bytes = bytes.len(), "downloaded response file");
            Ok(Some(bytes))
        })
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

/// LIBSSH2_FX_NO_SUCH_FILE.
fn is_no_such_file(err: &ssh2::Error) -> bool {
    matches!(err.code(), ErrorCode::SFTP(2))
}
