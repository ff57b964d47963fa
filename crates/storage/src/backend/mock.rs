//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// A backend operation, as recorded in the [`MockBackend`] journal and as
/// used to inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Exists,
    Read,
    Write,
    Delete,
    Rename,
    Stat,
}

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`]. Every call is
/// appended to a journal (whether it succeeds or not) so tests can assert
/// on the order of side effects, and any [`Operation`] can be made to fail
/// with [`fail_on`](Self::fail_on).
///
/// # Examples
///
/// ```
/// use routine_storage::backend::{MockBackend, Operation, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let backend = MockBackend::with_files([("uploads/song.mp3", b"ID3")]).fail_on(Operation::Delete);
/// assert!(backend.exists(Path::new("uploads/song.mp3")).await.unwrap());
/// assert!(backend.delete(Path::new("uploads/song.mp3")).await.is_err());
/// assert_eq!(backend.journal().last().map(|(op, _)| *op), Some(Operation::Delete));
/// # }
/// ```
pub struct MockBackend {
    storage: RwLock<HashMap<PathBuf, (UtcDateTime, Vec<u8>)>>,
    failures: HashSet<Operation>,
    journal: Mutex<Vec<(Operation, PathBuf)>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation; broken test setup should not
    /// produce a passing test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = UtcDateTime::now();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            storage: RwLock::new(map),
            failures: HashSet::new(),
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Make every call of `operation` fail with a backend error.
    pub fn fail_on(mut self, operation: Operation) -> Self {
        self.failures.insert(operation);
        self
    }

    /// Every operation attempted so far, in call order.
    pub fn journal(&self) -> Vec<(Operation, PathBuf)> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether `operation` has been attempted at least once.
    pub fn attempted(&self, operation: Operation) -> bool {
        self.journal().iter().any(|(op, _)| *op == operation)
    }

    /// Snapshot of every stored path, sorted.
    pub async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.storage.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn record(&self, operation: Operation, path: &Path) -> Result<()> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).push((operation, path.to_path_buf()));
        if self.failures.contains(&operation) {
            exn::bail!(ErrorKind::BackendError(format!("injected {operation:?} failure for {}", path.display())));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        if let Err(e) = self.record(Operation::List, prefix.unwrap_or(Path::new(""))) {
            return Box::pin(futures::stream::once(async { Err(e) }));
        }
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let entries: Vec<(PathBuf, UtcDateTime, u64)> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .map(|(path, (inserted, data))| (path.clone(), *inserted, data.len() as u64))
                    .collect()
            };
            for (path, inserted, size) in entries {
                yield Ok(FileInfo::new(path, size, inserted));
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.record(Operation::Exists, path)?;
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.record(Operation::Read, path)?;
        let path = validate_path(path)?;
        let (_inserted, data) =
            self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.record(Operation::Write, path)?;
        let path = validate_path(path)?;
        self.storage.write().await.insert(path, (UtcDateTime::now(), data.to_vec()));
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.record(Operation::Delete, path)?;
        let path = validate_path(path)?;
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.record(Operation::Rename, from)?;
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        let mut guard = self.storage.write().await;
        let data = guard.remove(&from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from)))?;
        guard.insert(to, data);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.record(Operation::Stat, path)?;
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let (inserted, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path.clone(), data.len() as u64, *inserted))
    }
}
