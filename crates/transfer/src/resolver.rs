//! Expands a source path into transfer units.
//!
//! Only one directory level is listed: a subdirectory of the source shows
//! up as a unit of its own and its contents are not visited.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ResolveError, SessionError};
use crate::session::{RemoteSession, join_remote};
use crate::types::{PathKind, TransferDirection, TransferUnit};
use crate::validation::validate_entry_name;

/// What the source path turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The local source does not exist. Nothing to transfer.
    Absent,
    /// A single file, transferred to the destination path as given.
    File(TransferUnit),
    /// A directory; one unit per immediate child.
    Directory(Vec<TransferUnit>),
}

impl Resolution {
    pub fn kind(&self) -> Option<PathKind> {
        match self {
            Self::Absent => None,
            Self::File(_) => Some(PathKind::File),
            Self::Directory(_) => Some(PathKind::Directory),
        }
    }

    pub fn into_units(self) -> Vec<TransferUnit> {
        match self {
            Self::Absent => Vec::new(),
            Self::File(unit) => vec![unit],
            Self::Directory(units) => units,
        }
    }
}

/// Resolves `source` into units whose destinations live under `dest`.
///
/// Downloads stat the source through `session`; uploads stat the local
/// filesystem. A missing remote source is an error, a missing local source
/// resolves to [`Resolution::Absent`].
pub async fn resolve(
    session: &dyn RemoteSession,
    direction: TransferDirection,
    source: &str,
    dest: &str,
) -> Result<Resolution, ResolveError> {
    let resolution = match direction {
        TransferDirection::Download => resolve_remote(session, source, dest).await?,
        TransferDirection::Upload => resolve_local(source, dest).await?,
    };

    debug!(
        %direction,
        source,
        kind = ?resolution.kind(),
        "source resolved"
    );
    Ok(resolution)
}

async fn resolve_remote(
    session: &dyn RemoteSession,
    source: &str,
    dest: &str,
) -> Result<Resolution, ResolveError> {
    let meta = session.stat(source).await.map_err(|e| match e {
        e if e.is_not_found() => ResolveError::NotFound(source.to_string()),
        e => ResolveError::Stat {
            path: source.to_string(),
            source: e,
        },
    })?;

    if !meta.is_dir() {
        return Ok(Resolution::File(TransferUnit::file(source, dest)));
    }

    let names = session
        .list_children(source)
        .await
        .map_err(|e: SessionError| ResolveError::List {
            path: source.to_string(),
            source: e,
        })?;

    let units = names
        .into_iter()
        .filter(|name| accept_entry(source, name))
        .map(|name| {
            let local = Path::new(dest).join(&name);
            TransferUnit::file(
                join_remote(source, &name),
                local.to_string_lossy().into_owned(),
            )
        })
        .collect();

    Ok(Resolution::Directory(units))
}

async fn resolve_local(source: &str, dest: &str) -> Result<Resolution, ResolveError> {
    let local_io = |e: std::io::Error| ResolveError::LocalIo {
        path: source.to_string(),
        source: e,
    };

    let meta = match tokio::fs::metadata(source).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(source, "local source does not exist, nothing to upload");
            return Ok(Resolution::Absent);
        }
        Err(e) => return Err(local_io(e)),
    };

    if !meta.is_dir() {
        return Ok(Resolution::File(TransferUnit::file(source, dest)));
    }

    let mut entries = tokio::fs::read_dir(source).await.map_err(local_io)?;
    let mut units = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(local_io)? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(source, name = ?raw, "skipping entry with a non UTF-8 name");
                continue;
            }
        };
        if !accept_entry(source, &name) {
            continue;
        }
        units.push(TransferUnit::file(
            entry.path().to_string_lossy().into_owned(),
            join_remote(dest, &name),
        ));
    }

    Ok(Resolution::Directory(units))
}

fn accept_entry(dir: &str, name: &str) -> bool {
    if name == "." || name == ".." {
        return false;
    }
    match validate_entry_name(name) {
        Ok(()) => true,
        Err(e) => {
            warn!(dir, error = %e, "skipping directory entry");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySession;

    fn local(dir: &Path, name: &str) -> String {
        dir.join(name).to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn remote_directory_lists_one_level() {
        let session = MemorySession::new();
        session.add_dir("/remote/data");
        session.add_file("/remote/data/a.txt", b"A");
        session.add_file("/remote/data/b.txt", b"B");
        session.add_dir("/remote/data/nested");
        session.add_file("/remote/data/nested/deep.txt", b"D");

        let out = Path::new("out");
        let res = resolve(&session, TransferDirection::Download, "/remote/data", "out")
            .await
            .unwrap();

        assert_eq!(res.kind(), Some(PathKind::Directory));
        assert_eq!(
            res.into_units(),
            vec![
                TransferUnit::file("/remote/data/a.txt", local(out, "a.txt")),
                TransferUnit::file("/remote/data/b.txt", local(out, "b.txt")),
                TransferUnit::file("/remote/data/nested", local(out, "nested")),
            ]
        );
    }

    #[tokio::test]
    async fn remote_file_keeps_dest_as_given() {
        let session = MemorySession::new();
        session.add_dir("/remote");
        session.add_file("/remote/report.csv", b"1,2");

        let res = resolve(
            &session,
            TransferDirection::Download,
            "/remote/report.csv",
            "copy.csv",
        )
        .await
        .unwrap();

        assert_eq!(
            res,
            Resolution::File(TransferUnit::file("/remote/report.csv", "copy.csv"))
        );
    }

    #[tokio::test]
    async fn missing_remote_source_is_an_error() {
        let session = MemorySession::new();
        let err = resolve(&session, TransferDirection::Download, "/nope", "out")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(p) if p == "/nope"));
    }

    #[tokio::test]
    async fn remote_listing_skips_dot_entries() {
        let session = MemorySession::new();
        session.add_dir("/remote");
        session.add_file("/remote/ok.txt", b"x");

        let units = resolve(&session, TransferDirection::Download, "/remote", "out")
            .await
            .unwrap()
            .into_units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].source, "/remote/ok.txt");
    }

    #[tokio::test]
    async fn missing_local_source_is_absent() {
        let session = MemorySession::new();
        let tmp = tempfile::tempdir().unwrap();
        let missing = local(tmp.path(), "upload");

        let res = resolve(&session, TransferDirection::Upload, &missing, "/")
            .await
            .unwrap();
        assert_eq!(res, Resolution::Absent);
        assert!(res.into_units().is_empty());
    }

    #[tokio::test]
    async fn local_directory_lists_one_level() {
        let session = MemorySession::new();
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"A").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested").join("deep.txt"), b"D").unwrap();

        let src = tmp.path().to_string_lossy().into_owned();
        let mut units = resolve(&session, TransferDirection::Upload, &src, "/srv/up")
            .await
            .unwrap()
            .into_units();
        units.sort_by(|a, b| a.dest.cmp(&b.dest));

        assert_eq!(
            units,
            vec![
                TransferUnit::file(local(tmp.path(), "a.txt"), "/srv/up/a.txt"),
                TransferUnit::file(local(tmp.path(), "nested"), "/srv/up/nested"),
            ]
        );
    }

    #[tokio::test]
    async fn local_file_is_single_unit() {
        let session = MemorySession::new();
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("one.bin"), b"1").unwrap();
        let src = local(tmp.path(), "one.bin");

        let res = resolve(&session, TransferDirection::Upload, &src, "/one.bin")
            .await
            .unwrap();
        assert_eq!(res, Resolution::File(TransferUnit::file(src, "/one.bin")));
    }

    #[tokio::test]
    async fn empty_directory_yields_no_units() {
        let session = MemorySession::new();
        session.add_dir("/empty");
        let res = resolve(&session, TransferDirection::Download, "/empty", "out")
            .await
            .unwrap();
        assert_eq!(res, Resolution::Directory(Vec::new()));
    }
}
