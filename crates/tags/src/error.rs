//! Tagging Error Types

use derive_more::{Display, Error};

/// A tagging error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tagging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a format the codec recognised. Unrecognised formats are not
/// errors, see [`Capability::Unsupported`](crate::Capability::Unsupported).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The audio was identified but its tags could not be parsed.
    #[display("could not read tags from {_0} audio")]
    Read(#[error(not(source))] String),
    /// The new tags could not be written into the audio bytes.
    #[display("could not write tags into {_0} audio")]
    Write(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
