//! Path validation.
//!
//! Storage paths are always relative to a backend root. Anything that would
//! climb out of that root (or that the OS would silently truncate) is
//! rejected before it reaches the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a storage path.
///
/// `.` components and empty segments are dropped, `..` is resolved against
/// the components seen so far and must never pop past the root. Null bytes
/// and Windows path prefixes are rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use routine_storage::validate_path;
/// assert!(validate_path("NoviceJack_Jill/Song_v1.mp3").is_ok());
/// assert!(validate_path("a/../Song.mp3").is_ok());
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("Intake/./uploads//../Song.mp3/").unwrap(),
///     Path::new("Intake/Song.mp3")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes survive Path::components() on Unix but truncate
                // paths in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate("Advanced/Song_v2.flac").unwrap(), Path::new("Advanced/Song_v2.flac"));
        assert_eq!(validate("upload.mp3").unwrap(), Path::new("upload.mp3"));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(validate("a//b//c").unwrap(), Path::new("a/b/c"));
        assert_eq!(validate("a/./b/./c").unwrap(), Path::new("a/b/c"));
        assert_eq!(validate("/absolute/looking").unwrap(), Path::new("absolute/looking"));
        assert_eq!(validate("Division///").unwrap(), Path::new("Division"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate("../etc/passwd").is_err());
        assert!(validate("a/../../b").is_err());
        assert!(validate("..").is_err());
        assert_eq!(validate("a/b/..").unwrap(), Path::new("a"));
    }

    #[test]
    fn test_rejects_null_bytes_and_empty() {
        assert!(validate("a\0b").is_err());
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
        assert!(validate("//").is_err());
    }
}
