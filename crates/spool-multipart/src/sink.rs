//! Temporary-file sink for part payloads.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::UploadError;

/// Attempts at finding an unused temp name before giving up.
const CREATE_ATTEMPTS: usize = 3;

/// A payload that has been fully written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    file: File,
    written: u64,
}

/// Owns at most one open temporary file at a time.
///
/// The handle is released when the sink is dropped, so an aborted or
/// cancelled session never leaks it. Files already on disk are left in place.
#[derive(Debug)]
pub struct PartSink {
    base_dir: PathBuf,
    current: Option<OpenFile>,
}

impl PartSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            current: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Close any open file and create a fresh, uniquely named one.
    pub async fn open(&mut self) -> Result<PathBuf, UploadError> {
        self.close().await?;

        let mut attempt = 0;
        let (path, file) = loop {
            let path = self.base_dir.join(Uuid::new_v4().to_string());
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt + 1 < CREATE_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        self.current = Some(OpenFile {
            path: path.clone(),
            file,
            written: 0,
        });
        Ok(path)
    }

    /// Append confirmed payload bytes to the open file.
    ///
    /// The bytes are flushed before this returns, so a session dropped
    /// afterwards leaves them on disk.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), UploadError> {
        if bytes.is_empty() {
            return Ok(());
        }
        if let Some(open) = self.current.as_mut() {
            open.file.write_all(bytes).await?;
            open.file.flush().await?;
            open.written += bytes.len() as u64;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn adopt(&mut self, path: PathBuf, file: File) {
        self.current = Some(OpenFile {
            path,
            file,
            written: 0,
        });
    }

    /// Flush and release the open file, if any.
    pub async fn close(&mut self) -> Result<Option<StoredFile>, UploadError> {
        let Some(mut open) = self.current.take() else {
            return Ok(None);
        };
        open.file.flush().await?;
        Ok(Some(StoredFile {
            path: open.path,
            size: open.written,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_and_closes() {
        let dir = TempDir::new().unwrap();
        let mut sink = PartSink::new(dir.path());

        let path = sink.open().await.unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(sink.is_open());

        sink.write(b"hello ").await.unwrap();
        sink.write(b"world").await.unwrap();
        let stored = sink.close().await.unwrap().unwrap();

        assert_eq!(stored.path, path);
        assert_eq!(stored.size, 11);
        assert!(!sink.is_open());
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn each_open_gets_a_fresh_path() {
        let dir = TempDir::new().unwrap();
        let mut sink = PartSink::new(dir.path());

        let first = sink.open().await.unwrap();
        sink.write(b"one").await.unwrap();
        let second = sink.open().await.unwrap();
        sink.close().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"");
    }

    #[tokio::test]
    async fn close_without_open_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut sink = PartSink::new(dir.path());
        assert!(sink.close().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_base_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut sink = PartSink::new(dir.path().join("does-not-exist"));
        let err = sink.open().await.unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }
}
