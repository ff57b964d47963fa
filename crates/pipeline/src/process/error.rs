//! Error types for the [`process`](super) module.
//!
//! Each variant names the step of a row that failed. A failed row is left
//! unflagged and is picked up again by the next scan.

use derive_more::{Display, Error};

/// A row processing error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for row processing.
pub type Result<T> = std::result::Result<T, Error>;

/// ### Validation Errors
/// - [`ErrorKind::MissingRequiredField`]
/// - [`ErrorKind::MalformedRow`]
/// - [`ErrorKind::SourceNotFound`]
///
/// ### Dependency Errors
/// Everything else: storage, tagging or the sheet failed part way through.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A required cell is empty, or empty once sanitized.
    #[display("missing required field: {_0}")]
    MissingRequiredField(#[error(not(source))] &'static str),
    /// The row has fewer cells than the form produces.
    #[display("malformed row: expected 11 cells, found {_0}")]
    MalformedRow(#[error(not(source))] usize),
    /// The source reference does not point at exactly one file in the pool.
    #[display("source file not found: {_0}")]
    SourceNotFound(#[error(not(source))] String),
    #[display("could not download source file")]
    DownloadError,
    #[display("could not tag audio file")]
    TaggingError,
    /// The division folder could not be listed.
    #[display("destination folder unavailable")]
    DestinationUnavailable,
    #[display("could not upload renamed file")]
    UploadError,
    /// The upload succeeded but the source could not be removed.
    #[display("could not delete source file")]
    DeleteError,
    #[display("could not mark row as processed")]
    FlagWriteError,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MissingRequiredField(_) | Self::MalformedRow(_) => false,
            // The file might be uploaded later.
            Self::SourceNotFound(_) => true,
            Self::DownloadError
            | Self::TaggingError
            | Self::DestinationUnavailable
            | Self::UploadError
            | Self::DeleteError
            | Self::FlagWriteError => true,
        }
    }
}
