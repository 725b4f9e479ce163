//! Remote session trait.
//!
//! `RemoteSession` is implemented by the SFTP crate on top of `russh-sftp`.
//! Using a trait keeps the scheduler decoupled from the transport and
//! testable with an in-memory fake.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::SessionError;

/// Byte stream returned by [`RemoteSession::read_file`].
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Byte sink returned by [`RemoteSession::write_file`].
///
/// Callers must `shutdown()` the writer to flush and close the remote handle.
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Boxed future returned by session operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + Send + 'a>>;

/// Type of a remote filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, devices, sockets and anything else.
    Other,
}

/// Subset of remote attributes the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub kind: EntryKind,
    pub size: Option<u64>,
}

impl RemoteMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Authenticated handle to a remote filesystem.
///
/// Implementations must tolerate concurrent calls from several workers;
/// the pool shares one handle behind an `Arc`.
pub trait RemoteSession: Send + Sync {
    /// Returns metadata for `path`, following symlinks.
    fn stat<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteMetadata>;

    /// Lists the entry names of directory `path`, in server order.
    fn list_children<'a>(&'a self, path: &'a str) -> SessionFuture<'a, Vec<String>>;

    /// Creates a single directory. The parent must exist.
    fn create_dir<'a>(&'a self, path: &'a str) -> SessionFuture<'a, ()>;

    /// Opens `path` for reading.
    fn read_file<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteReader>;

    /// Creates or truncates `path` for writing.
    fn write_file<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteWriter>;

    /// Closes the session. Further calls fail with [`SessionError::Closed`].
    fn close(&self) -> SessionFuture<'_, ()>;
}

/// Joins a remote directory and an entry name with `/`.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Creates `path` and any missing ancestors on the remote side.
///
/// An existing directory is accepted; an existing non-directory is an error.
pub async fn ensure_remote_dir(session: &dyn RemoteSession, path: &str) -> Result<(), SessionError> {
    match session.stat(path).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(SessionError::Protocol(format!(
                "a non-directory entry already exists: {path}"
            )));
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let absolute = path.starts_with('/');
    let mut current = String::new();
    for component in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
        current = if current.is_empty() && absolute {
            format!("/{component}")
        } else {
            join_remote(&current, component)
        };

        match session.stat(&current).await {
            Ok(meta) if meta.is_dir() => continue,
            Ok(_) => {
                return Err(SessionError::Protocol(format!(
                    "path component is not a directory: {current}"
                )));
            }
            Err(e) if e.is_not_found() => session.create_dir(&current).await?,
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
