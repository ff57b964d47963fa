//! Processing of a single submission row.
//!
//! A row moves through [`Stage`]s strictly in order. The first failing stage
//! ends the row: nothing after it is attempted and the processed flag stays
//! unset, so the row is retried by the next scan.

pub mod error;
mod locate;

use crate::Context;
use crate::collision::resolve;
use crate::filename::Submission;
use crate::process::error::{Error, ErrorKind, Result};
use crate::process::locate::locate;
use derive_more::Display;
use exn::ResultExt;
use routine_sheet::{LedgerEntry, ProcessedFlag, SubmissionRow};
use routine_tags::{Capability, merge};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// The steps a row goes through, in order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[display("parse")]
    Parse,
    #[display("locate")]
    Locate,
    #[display("download")]
    Download,
    #[display("tag")]
    Tag,
    #[display("name")]
    Name,
    #[display("upload")]
    Upload,
    #[display("delete")]
    Delete,
    #[display("mark")]
    Mark,
}

/// Whether the uploaded bytes carry the merged tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tagging {
    Tagged { format: String },
    /// The format has no known tag layout; the bytes were uploaded unchanged.
    Unsupported,
}

/// What happened to the original once its copy was uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    Deleted,
    /// The original could not be deleted and was moved to this path in the
    /// source pool.
    Moved(PathBuf),
}

/// A row that made it all the way to [`Stage::Mark`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
    pub row: u32,
    /// Where the source file was found in the source pool.
    pub source: PathBuf,
    /// Path of the uploaded file within the destination.
    pub destination: PathBuf,
    pub version: u32,
    pub tagging: Tagging,
    pub disposal: Disposal,
}

/// A row that stopped at `stage`. Its processed flag was not written.
#[derive(Debug)]
pub struct RowFailure {
    pub row: u32,
    pub stage: Stage,
    pub error: Error,
}

#[derive(Debug)]
pub enum RowOutcome {
    /// Already flagged as processed; nothing was touched.
    Skipped(u32),
    Marked(RowReport),
}

/// Process one row: locate, download, tag, name, upload, delete, mark.
///
/// Delete is only attempted after a successful upload, and the processed
/// flag is only written after both succeeded. Failures never escape as
/// anything other than a [`RowFailure`].
#[instrument(skip_all, fields(row = row.number()))]
pub async fn process_row(ctx: &Context, row: &SubmissionRow) -> std::result::Result<RowOutcome, RowFailure> {
    if row.is_processed() {
        tracing::debug!("Row already processed");
        return Ok(RowOutcome::Skipped(row.number()));
    }
    let mut stage = Stage::Parse;
    match process_row_inner(ctx, row, &mut stage).await {
        Ok(report) => Ok(RowOutcome::Marked(report)),
        Err(error) => Err(RowFailure {
            row: row.number(),
            stage,
            error,
        }),
    }
}

async fn process_row_inner(ctx: &Context, row: &SubmissionRow, stage: &mut Stage) -> Result<RowReport> {
    *stage = Stage::Parse;
    let submission = Submission::parse(row)?;

    *stage = Stage::Locate;
    let source = locate(&ctx.source, &submission.source_reference, &ctx.processed_originals).await?;
    tracing::debug!(path = %source.path.display(), "Located source file");

    *stage = Stage::Download;
    let original = ctx.source.read(&source.path).await.or_raise(|| ErrorKind::DownloadError)?;

    *stage = Stage::Tag;
    let extension = source.extension();
    let hint = extension.map(str::to_ascii_lowercase);
    let fields = submission.tag_fields();
    let (data, tagging) = match ctx.codec.open(&original, hint.as_deref()).or_raise(|| ErrorKind::TaggingError)? {
        Capability::Supported(editor) => {
            let tags = merge(editor.tags(), &fields);
            let data = editor.write(&original, &tags).or_raise(|| ErrorKind::TaggingError)?;
            let format = editor.format().to_string();
            tracing::debug!(format = %format, "Tagged audio file");
            (data, Tagging::Tagged { format })
        },
        Capability::Unsupported => {
            tracing::info!(path = %source.path.display(), "Unsupported audio format, uploading without tags");
            (original, Tagging::Unsupported)
        },
    };

    *stage = Stage::Name;
    let base = submission.derive_name();
    let folder = PathBuf::from(&submission.division);
    let existing =
        ctx.destination.backend().list_names(&folder).await.or_raise(|| ErrorKind::DestinationUnavailable)?;
    let (filename, version) = resolve(&base, extension, &existing);
    let destination = folder.join(&filename);

    *stage = Stage::Upload;
    ctx.destination.backend().write(&destination, &data).await.or_raise(|| ErrorKind::UploadError)?;
    tracing::info!(path = %destination.display(), version, "Uploaded submission");

    if let Some(ledger) = &ctx.ledger {
        let entry = LedgerEntry {
            timestamp: row.timestamp().to_string(),
            partnership: fields.title(),
            division: submission.division.clone(),
            routine_name: row.routine_name().to_string(),
            descriptor: row.personal_descriptor().to_string(),
            version,
        };
        // The upload already happened; the ledger must not undo that.
        if let Err(e) = ledger.record(&entry).await {
            tracing::warn!(error = ?e, division = %entry.division, "Could not record submission in ledger");
        }
    }

    *stage = Stage::Delete;
    let disposal = dispose(ctx, row.number(), &source.path).await?;

    *stage = Stage::Mark;
    ctx.sheet.write_flag(row.number(), ProcessedFlag::Processed).await.or_raise(|| ErrorKind::FlagWriteError)?;

    Ok(RowReport {
        row: row.number(),
        source: source.path,
        destination,
        version,
        tagging,
        disposal,
    })
}

/// Removes an uploaded original from the source pool.
///
/// An original that cannot be deleted is moved into the processed-originals
/// folder instead, which identifier lookups never search. Only when both
/// fail does the row fail, with the delete error.
async fn dispose(ctx: &Context, row: u32, source: &Path) -> Result<Disposal> {
    let delete_error = match ctx.source.delete(source).await {
        Ok(()) => return Ok(Disposal::Deleted),
        Err(e) => e,
    };
    tracing::warn!(path = %source.display(), error = ?delete_error, "Could not delete source file, moving it aside");

    let Some(name) = source.file_name() else {
        return Err(delete_error).or_raise(|| ErrorKind::DeleteError);
    };
    let mut target = ctx.processed_originals.join(name);
    // Keep earlier originals of the same name.
    if matches!(ctx.source.exists(&target).await, Ok(true)) {
        let mut prefixed = OsString::from(format!("{row}_"));
        prefixed.push(name);
        target = ctx.processed_originals.join(prefixed);
    }

    match ctx.source.rename(source, &target).await {
        Ok(()) => {
            tracing::info!(path = %target.display(), "Moved source file to processed originals");
            Ok(Disposal::Moved(target))
        },
        Err(e) => {
            tracing::warn!(path = %target.display(), error = ?e, "Could not move source file aside");
            Err(delete_error).or_raise(|| ErrorKind::DeleteError)
        },
    }
}
