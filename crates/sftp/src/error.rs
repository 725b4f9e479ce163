//! Connection errors and SFTP status mapping.

use capysync_transfer::SessionError;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::StatusCode;

/// Errors produced while establishing a session. Fatal to the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("server host key rejected for {0}")]
    HostKeyRejected(String),

    #[error("authentication failed for user {user} (remaining methods: {remaining})")]
    AuthFailed { user: String, remaining: String },

    #[error("SFTP subsystem error: {0}")]
    Sftp(#[from] SftpError),
}

/// Maps a `russh-sftp` error for `path` onto the transport-neutral [`SessionError`].
pub(crate) fn map_sftp_error(path: &str, err: SftpError) -> SessionError {
    match err {
        SftpError::Status(status) => match status.status_code {
            StatusCode::NoSuchFile => SessionError::NotFound(path.to_string()),
            StatusCode::PermissionDenied => SessionError::PermissionDenied(path.to_string()),
            StatusCode::NoConnection | StatusCode::ConnectionLost => SessionError::Closed,
            code => SessionError::Protocol(if status.error_message.is_empty() {
                format!("{code:?} on {path}")
            } else {
                format!("{} on {path}", status.error_message)
            }),
        },
        SftpError::IO(msg) => {
            SessionError::Io(std::io::Error::other(format!("{msg} on {path}")))
        }
        other => SessionError::Protocol(format!("{other} on {path}")),
    }
}
