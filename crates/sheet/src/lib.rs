//! Submission sheet access.
//!
//! Rows are read through a [`RowSource`], which is also the only place the
//! [`ProcessedFlag`] is ever written. The [`SubmissionLedger`] keeps the
//! per-division record of what has been filed.

pub mod error;
mod ledger;
#[cfg(feature = "mock")]
mod mock;
mod row;
mod source;

pub use crate::ledger::{
    DivisionSnapshot, LEDGER_FOLDER, LEDGER_HEADERS, LedgerEntry, SNAPSHOT_FILE, Snapshot, SubmissionLedger,
};
#[cfg(feature = "mock")]
pub use crate::mock::MemorySheet;
pub use crate::row::{Column, FIRST_DATA_ROW, FLAG_COLUMN, FORM_COLUMNS, ProcessedFlag, SubmissionRow};
pub use crate::source::{CsvSheet, RowSource, SheetHandle};
