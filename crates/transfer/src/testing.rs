//! In-memory `RemoteSession` used by the unit tests.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::SessionError;
use crate::session::{
    EntryKind, RemoteMetadata, RemoteReader, RemoteSession, RemoteWriter, SessionFuture,
};

#[derive(Clone)]
enum Node {
    Dir,
    File(Arc<Mutex<Vec<u8>>>),
    /// Exists but cannot be opened for reading.
    Denied,
    /// Opens, then fails mid-stream.
    Broken,
    /// Opening it panics the calling task.
    Panic,
}

#[derive(Default)]
pub struct MemorySession {
    nodes: Mutex<Vec<(String, Node)>>,
    created: Mutex<Vec<String>>,
    deny_mkdir: AtomicBool,
    closed: AtomicBool,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    opened: AtomicUsize,
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => "",
    }
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: &str) {
        self.insert(path, Node::Dir);
    }

    pub fn add_file(&self, path: &str, data: &[u8]) {
        self.insert(path, Node::File(Arc::new(Mutex::new(data.to_vec()))));
    }

    pub fn add_denied(&self, path: &str) {
        self.insert(path, Node::Denied);
    }

    pub fn add_broken(&self, path: &str) {
        self.insert(path, Node::Broken);
    }

    pub fn add_panicking(&self, path: &str) {
        self.insert(path, Node::Panic);
    }

    pub fn deny_mkdir(&self) {
        self.deny_mkdir.store(true, Ordering::SeqCst);
    }

    /// Every file open sleeps for `latency` while counted as in flight.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.lookup(path), Some(Node::Dir))
    }

    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        match self.lookup(path) {
            Some(Node::File(data)) => Some(data.lock().unwrap().clone()),
            _ => None,
        }
    }

    pub fn created_dirs(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn file_count(&self) -> usize {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, n)| matches!(n, Node::File(_)))
            .count()
    }

    fn insert(&self, path: &str, node: Node) {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(slot) = nodes.iter_mut().find(|(p, _)| p == path) {
            slot.1 = node;
        } else {
            nodes.push((path.to_string(), node));
        }
    }

    fn lookup(&self, path: &str) -> Option<Node> {
        if path == "/" {
            return Some(Node::Dir);
        }
        let path = path.trim_end_matches('/');
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, n)| n.clone())
    }

    fn check_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        self.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RemoteSession for MemorySession {
    fn stat<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteMetadata> {
        Box::pin(async move {
            self.check_open()?;
            match self.lookup(path) {
                Some(Node::Dir) => Ok(RemoteMetadata {
                    kind: EntryKind::Directory,
                    size: None,
                }),
                Some(Node::File(data)) => Ok(RemoteMetadata {
                    kind: EntryKind::File,
                    size: Some(data.lock().unwrap().len() as u64),
                }),
                Some(Node::Denied | Node::Broken | Node::Panic) => Ok(RemoteMetadata {
                    kind: EntryKind::File,
                    size: None,
                }),
                None => Err(SessionError::NotFound(path.to_string())),
            }
        })
    }

    fn list_children<'a>(&'a self, path: &'a str) -> SessionFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.check_open()?;
            if !self.is_dir(path) {
                return Err(SessionError::NotFound(path.to_string()));
            }
            let dir = path.trim_end_matches('/');
            let dir = if dir.is_empty() { "/" } else { dir };
            let mut names = vec![".".to_string(), "..".to_string()];
            names.extend(
                self.nodes
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(p, _)| parent_of(p) == dir && p != dir)
                    .map(|(p, _)| p.rsplit('/').next().unwrap_or(p).to_string()),
            );
            Ok(names)
        })
    }

    fn create_dir<'a>(&'a self, path: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.check_open()?;
            if self.deny_mkdir.load(Ordering::SeqCst) {
                return Err(SessionError::PermissionDenied(path.to_string()));
            }
            if !self.is_dir(parent_of(path)) {
                return Err(SessionError::NotFound(parent_of(path).to_string()));
            }
            self.add_dir(path);
            self.created.lock().unwrap().push(path.to_string());
            Ok(())
        })
    }

    fn read_file<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteReader> {
        Box::pin(async move {
            self.check_open()?;
            self.simulate_latency().await;
            match self.lookup(path) {
                Some(Node::File(data)) => {
                    let bytes = data.lock().unwrap().clone();
                    Ok(Box::new(io::Cursor::new(bytes)) as RemoteReader)
                }
                Some(Node::Broken) => Ok(Box::new(BrokenReader { sent: false }) as RemoteReader),
                Some(Node::Denied) => Err(SessionError::PermissionDenied(path.to_string())),
                Some(Node::Panic) => panic!("read_file({path}) panicked"),
                Some(Node::Dir) => Err(SessionError::Protocol(format!("is a directory: {path}"))),
                None => Err(SessionError::NotFound(path.to_string())),
            }
        })
    }

    fn write_file<'a>(&'a self, path: &'a str) -> SessionFuture<'a, RemoteWriter> {
        Box::pin(async move {
            self.check_open()?;
            self.simulate_latency().await;
            if !self.is_dir(parent_of(path)) {
                return Err(SessionError::NotFound(parent_of(path).to_string()));
            }
            if self.is_dir(path) {
                return Err(SessionError::Protocol(format!("is a directory: {path}")));
            }
            let buf = Arc::new(Mutex::new(Vec::new()));
            self.insert(path, Node::File(Arc::clone(&buf)));
            Ok(Box::new(MemoryWriter { buf }) as RemoteWriter)
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

struct MemoryWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Yields a few bytes, then a connection reset.
struct BrokenReader {
    sent: bool,
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.sent {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        self.sent = true;
        buf.put_slice(b"part");
        Poll::Ready(Ok(()))
    }
}
