//! Sheet Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A sheet error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sheet and ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The workbook or the requested worksheet does not exist.
    #[display("worksheet not found: {}", _0.display())]
    WorksheetNotFound(#[error(not(source))] PathBuf),
    /// Rows could not be read from the sheet.
    #[display("could not read sheet")]
    Read,
    /// The sheet could not be updated.
    #[display("could not write sheet")]
    Write,
    /// The row number is not a data row of the sheet.
    #[display("row {_0} is not a data row")]
    RowOutOfRange(#[error(not(source))] u32),
    /// A ledger file could not be read from or written to storage.
    #[display("submission ledger storage failure")]
    Storage,
    /// A ledger file or snapshot could not be encoded or decoded.
    #[display("submission ledger encoding failure")]
    Encoding,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read | Self::Write | Self::Storage)
    }
}
