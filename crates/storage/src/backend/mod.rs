//! Storage backend trait and implementations.
//!
//! The source pool (where submitters' uploads land) and the destination
//! root (where renamed files are filed by division) are both accessed
//! through [`StorageBackend`], so the pipeline never cares whether it is
//! talking to a local directory, a read-only wrapper used for dry runs, or
//! the in-memory mock used in tests.

mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::{MockBackend, Operation};
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::collections::BTreeSet;
use std::path::Path;
use std::pin::Pin;

type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use routine_storage::{backend::StorageBackend, error::Result};
///
/// async fn move_upload(backend: &dyn StorageBackend) -> Result<()> {
///     let data = backend.read(Path::new("uploads/song.mp3")).await?;
///     backend.write(Path::new("Novice/Song_v1.mp3"), &data).await?;
///     backend.delete(Path::new("uploads/song.mp3")).await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata matching an optional prefix.
    ///
    /// Yields every file (recursively) whose path starts with `prefix`,
    /// compared component-wise: the prefix `Novice` matches
    /// `Novice/a.mp3` but not `NoviceJack/a.mp3`.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Names of the files sitting directly inside `folder`.
    ///
    /// A folder that does not exist yet is simply empty.
    async fn list_names(&self, folder: &Path) -> Result<BTreeSet<String>> {
        let folder = validate_path(folder)?;
        let files = self.list(Some(folder.as_path())).await?;
        Ok(files
            .iter()
            .filter(|file| file.is_child_of(&folder))
            .filter_map(|file| file.file_name().map(str::to_string))
            .collect())
    }

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or overwriting the file.
    ///
    /// Implementations create parent folders as needed, so writing into a
    /// division folder that does not exist yet creates it.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename/move a file within the same backend, overwriting the
    /// destination if it exists.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
