//! Where artifact bytes come from
//!
//! Abstracts the channel's file store for testability. Provides:
//! - RemoteFiles trait: locate a posted file and stream its bytes
//! - BotClient impl: the Telegram Bot API
//! - LocalFiles: a local directory, for backfilling builds by hand
//! - MockRemote: in-memory files with failure injection for tests

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use lcdl_telegram::{BotClient, TelegramError};
use thiserror::Error;

/// Capability to fetch the bytes behind a posted file handle.
pub trait RemoteFiles {
    /// Resolve a file handle to a fetchable path.
    fn locate(&self, file_id: &str) -> Result<String, RemoteError>;

    /// Open a byte stream for a path returned by [`RemoteFiles::locate`].
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError>;
}

/// Errors from the file store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no such file: {0}")]
    NotFound(String),
}

impl RemoteFiles for BotClient {
    fn locate(&self, file_id: &str) -> Result<String, RemoteError> {
        Ok(self.file_path(file_id)?)
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
        Ok(Box::new(self.download(path)?))
    }
}

impl<T: RemoteFiles + ?Sized> RemoteFiles for &T {
    fn locate(&self, file_id: &str) -> Result<String, RemoteError> {
        (**self).locate(file_id)
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
        (**self).open(path)
    }
}

/// Serves files from a local directory; the file handle is the file name.
#[derive(Debug, Clone)]
pub struct LocalFiles {
    dir: PathBuf,
}

impl LocalFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RemoteFiles for LocalFiles {
    fn locate(&self, file_id: &str) -> Result<String, RemoteError> {
        let path = self.dir.join(file_id);
        if Path::new(file_id).components().count() != 1 || !path.is_file() {
            return Err(RemoteError::NotFound(file_id.to_string()));
        }
        Ok(path.to_string_lossy().into_owned())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
        Ok(Box::new(File::open(path)?))
    }
}

enum MockFile {
    Complete(Vec<u8>),
    /// Yields the prefix, then fails.
    BrokenAfter(Vec<u8>),
}

/// In-memory file store for tests.
#[derive(Default)]
pub struct MockRemote {
    files: Mutex<HashMap<String, MockFile>>,
    opens: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file that downloads completely.
    pub fn insert(&self, file_id: impl Into<String>, content: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(file_id.into(), MockFile::Complete(content.into()));
        }
    }

    /// Register a file whose download breaks after `prefix`.
    pub fn insert_broken(&self, file_id: impl Into<String>, prefix: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(file_id.into(), MockFile::BrokenAfter(prefix.into()));
        }
    }

    /// Builder form of [`MockRemote::insert`].
    pub fn with_file(self, file_id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(file_id, content);
        self
    }

    /// How many downloads were started.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl RemoteFiles for MockRemote {
    fn locate(&self, file_id: &str) -> Result<String, RemoteError> {
        let files = self
            .files
            .lock()
            .map_err(|_| RemoteError::NotFound(file_id.to_string()))?;
        if files.contains_key(file_id) {
            Ok(format!("mock/{}", file_id))
        } else {
            Err(RemoteError::NotFound(file_id.to_string()))
        }
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let file_id = path.strip_prefix("mock/").unwrap_or(path);
        let files = self
            .files
            .lock()
            .map_err(|_| RemoteError::NotFound(file_id.to_string()))?;

        match files.get(file_id) {
            Some(MockFile::Complete(data)) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(MockFile::BrokenAfter(prefix)) => Ok(Box::new(BrokenReader {
                inner: Cursor::new(prefix.clone()),
            })),
            None => Err(RemoteError::NotFound(file_id.to_string())),
        }
    }
}

struct BrokenReader {
    inner: Cursor<Vec<u8>>,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
            n => Ok(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(remote: &dyn RemoteFiles, file_id: &str) -> io::Result<Vec<u8>> {
        let path = remote.locate(file_id).map_err(io::Error::other)?;
        let mut reader = remote.open(&path).map_err(io::Error::other)?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_mock_remote_serves_files() {
        let remote = MockRemote::new().with_file("abc", b"payload".to_vec());

        assert_eq!(read_all(&remote, "abc").unwrap(), b"payload");
        assert_eq!(remote.open_count(), 1);
        assert!(matches!(remote.locate("zzz"), Err(RemoteError::NotFound(_))));
    }

    #[test]
    fn test_mock_remote_broken_download() {
        let remote = MockRemote::new();
        remote.insert_broken("abc", b"partial".to_vec());

        let err = read_all(&remote, "abc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_local_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Lawnstep-2.3.zip"), b"zip bytes").unwrap();
        let local = LocalFiles::new(dir.path());

        assert_eq!(read_all(&local, "Lawnstep-2.3.zip").unwrap(), b"zip bytes");
        assert!(matches!(local.locate("missing.zip"), Err(RemoteError::NotFound(_))));
        assert!(matches!(local.locate("../etc/passwd"), Err(RemoteError::NotFound(_))));
    }
}
