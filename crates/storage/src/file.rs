//! File metadata returned by storage backends.

use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// File metadata returned by storage backends.
///
/// Used for listing operations, source reference resolution and
/// destination folder collision checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<OffsetDateTime>) -> Self {
        Self {
            path: path.into(),
            size,
            modified: modified.into(),
        }
    }

    /// Final path component, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// File extension without the leading dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str()).filter(|e| !e.is_empty())
    }

    /// Whether this file sits directly inside `folder` (not in a subfolder).
    pub fn is_child_of(&self, folder: &Path) -> bool {
        self.path.parent() == Some(folder)
    }
}
