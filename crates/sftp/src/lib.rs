//! SFTP implementation of [`RemoteSession`].
//!
//! One SSH connection carries one SFTP channel. `russh-sftp` tags every
//! request with an id and multiplexes replies, so a single [`SftpRemote`]
//! can serve all pool workers concurrently.

mod error;
mod handler;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use capysync_transfer::{
    EntryKind, RemoteMetadata, RemoteReader, RemoteSession, RemoteWriter, SessionError,
    SessionFuture,
};
use russh::client::{self, AuthResult};
use russh_sftp::client::SftpSession;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::handler::ClientHandler;
pub use crate::error::ConnectError;
use crate::error::map_sftp_error;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Parameters for [`SftpRemote::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Accepted server keys; empty accepts any key.
    pub allowed_fingerprints: Vec<String>,
    /// Drop the connection after this much silence.
    pub inactivity_timeout: Option<Duration>,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: String::new(),
            allowed_fingerprints: Vec::new(),
            inactivity_timeout: Some(Duration::from_secs(300)),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }
}

/// Authenticated SFTP session.
pub struct SftpRemote {
    sftp: SftpSession,
    ssh: Mutex<Option<client::Handle<ClientHandler>>>,
    closed: AtomicBool,
}

impl SftpRemote {
    /// Connects, authenticates with a password and opens the `sftp` subsystem.
    pub async fn connect(options: &ConnectOptions) -> Result<Self, ConnectError> {
        let config = client::Config {
            inactivity_timeout: options.inactivity_timeout,
            ..Default::default()
        };
        let handler = ClientHandler {
            allowed_fingerprints: options.allowed_fingerprints.clone(),
        };

        let addr = (options.host.as_str(), options.port);
        let mut ssh = client::connect(Arc::new(config), addr, handler)
            .await
            .map_err(|e| match e {
                russh::Error::UnknownKey => ConnectError::HostKeyRejected(options.host.clone()),
                other => ConnectError::Ssh(other),
            })?;
        debug!(host = %options.host, port = options.port, "SSH connection established");

        let auth = ssh
            .authenticate_password(&options.username, &options.password)
            .await?;
        if let AuthResult::Failure {
            remaining_methods, ..
        } = auth
        {
            return Err(ConnectError::AuthFailed {
                user: options.username.clone(),
                remaining: format!("{remaining_methods:?}"),
            });
        }

        let channel = ssh.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        info!(
            host = %options.host,
            port = options.port,
            user = %options.username,
            "SFTP session opened"
        );

        Ok(Self {
            sftp,
            ssh: Mutex::new(Some(ssh)),
            closed: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }
}

impl RemoteSession for SftpRemote {
    fn stat<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteMetadata> {
        Box::pin(async move {
            self.check_open()?;
            let attrs = self
                .sftp
                .metadata(path)
                .await
                .map_err(|e| map_sftp_error(path, e))?;
            let kind = if attrs.is_dir() {
                EntryKind::Directory
            } else if attrs.is_regular() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            Ok(RemoteMetadata {
                kind,
                size: attrs.size,
            })
        })
    }

    fn list_children<'a>(&'a self, path: &'a str) -> SessionFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.check_open()?;
            let entries = self
                .sftp
                .read_dir(path)
                .await
                .map_err(|e| map_sftp_error(path, e))?;
            Ok(entries.map(|entry| entry.file_name()).collect())
        })
    }

    fn create_dir<'a>(&'a self, path: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.check_open()?;
            self.sftp
                .create_dir(path)
                .await
                .map_err(|e| map_sftp_error(path, e))
        })
    }

    fn read_file<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteReader> {
        Box::pin(async move {
            self.check_open()?;
            let file = self
                .sftp
                .open(path)
                .await
                .map_err(|e| map_sftp_error(path, e))?;
            Ok(Box::new(file) as RemoteReader)
        })
    }

    fn write_file<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteWriter> {
        Box::pin(async move {
            self.check_open()?;
            let file = self
                .sftp
                .create(path)
                .await
                .map_err(|e| map_sftp_error(path, e))?;
            Ok(Box::new(file) as RemoteWriter)
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            if let Err(e) = self.sftp.close().await {
                warn!(error = %e, "SFTP close failed");
            }
            if let Some(ssh) = self.ssh.lock().await.take() {
                ssh.disconnect(russh::Disconnect::ByApplication, "", "en")
                    .await
                    .map_err(|e| SessionError::Protocol(e.to_string()))?;
            }
            info!("SFTP session closed");
            Ok(())
        })
    }
}
