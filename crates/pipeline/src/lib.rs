//! Routine music submission processing.
//!
//! [`scan`] walks the submission sheet and hands every unprocessed row to
//! [`process_row`](process::process_row), which files the submitted audio
//! under its canonical name and flags the row as done.

mod collision;
mod consts;
pub mod error;
mod filename;
pub mod process;
mod scan;

pub use crate::collision::resolve as resolve_collision;
pub use crate::filename::{Submission, sanitize, season_year};
pub use crate::scan::{ScanEvent, ScanSummary, run, scan};

use routine_sheet::{SheetHandle, SubmissionLedger};
use routine_storage::BackendHandle;
use routine_tags::{LoftyCodec, TagCodec};
use std::path::PathBuf;
use std::sync::Arc;

/// Where processed submissions are filed, one folder per division.
///
/// Resolved once at startup: either a dedicated root or the source pool
/// itself.
#[derive(Clone)]
pub struct Destination {
    backend: BackendHandle,
}
impl Destination {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }
}

/// Folder in the source pool that originals are moved into when they cannot
/// be deleted.
pub const PROCESSED_ORIGINALS: &str = "RoutineMusicHandler_ProcessedOriginals";

/// Everything a scan needs.
pub struct Context {
    pub(crate) source: BackendHandle,
    pub(crate) destination: Destination,
    pub(crate) sheet: SheetHandle,
    pub(crate) codec: Arc<dyn TagCodec>,
    pub(crate) ledger: Option<SubmissionLedger>,
    pub(crate) processed_originals: PathBuf,
}
impl Context {
    /// A context tagging with [`LoftyCodec`], without a submission ledger,
    /// and moving undeletable originals into [`PROCESSED_ORIGINALS`].
    pub fn new(source: BackendHandle, destination: Destination, sheet: SheetHandle) -> Self {
        Self {
            source,
            destination,
            sheet,
            codec: Arc::new(LoftyCodec),
            ledger: None,
            processed_originals: PathBuf::from(PROCESSED_ORIGINALS),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn TagCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Record every upload in `ledger`, and publish its snapshot after each
    /// scan.
    pub fn with_ledger(mut self, ledger: SubmissionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Move undeletable originals into `folder` (relative to the source pool)
    /// instead of [`PROCESSED_ORIGINALS`].
    pub fn with_processed_originals(mut self, folder: impl Into<PathBuf>) -> Self {
        self.processed_originals = folder.into();
        self
    }
}
