//! Pipeline Error Types
//!
//! Only failures that stop a whole scan live here. Failures of a single row
//! are [`RowFailure`](crate::process::RowFailure)s and never abort a scan.

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The submission sheet could not be prepared or read.
    #[display("could not read the submission sheet")]
    Sheet,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Sheet => true,
        }
    }
}
