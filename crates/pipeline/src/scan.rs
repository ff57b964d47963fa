use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::process::{RowFailure, RowOutcome, RowReport, process_row};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};

/// Progress events emitted by [`scan`] as it works through the sheet.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of data rows.
/// 3. One of [`Skipped`](Self::Skipped), [`Processed`](Self::Processed) or
///    [`Failed`](Self::Failed) per row, in row order.
/// 4. [`Complete`](Self::Complete) exactly once, with the run summary.
///
/// Only a sheet that cannot be prepared or read ends the stream early, as an
/// `Err` item, in which case [`Complete`](Self::Complete) is never emitted.
#[derive(Debug)]
pub enum ScanEvent {
    Started,
    DiscoveryComplete(u64),
    /// The row was already flagged as processed.
    Skipped(u32),
    Processed(RowReport),
    /// The row was left unflagged and will be retried on the next scan.
    Failed(RowFailure),
    Complete(ScanSummary),
}

/// Counts of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub failed_rows: Vec<u32>,
}
impl ScanSummary {
    fn count(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Skipped(_) => self.skipped += 1,
            ScanEvent::Processed(_) => self.processed += 1,
            ScanEvent::Failed(failure) => {
                self.failed += 1;
                self.failed_rows.push(failure.row);
            },
            ScanEvent::Started | ScanEvent::DiscoveryComplete(_) | ScanEvent::Complete(_) => {},
        }
    }
}

/// Streams [`ScanEvent`]s for every row of the submission sheet, processing
/// each unprocessed row in turn.
///
/// Rows are handled one at a time, in sheet order, and each row is visited
/// at most once. A failed row is reported and the scan moves on.
pub fn scan(ctx: &Context) -> impl Stream<Item = Result<ScanEvent>> + '_ {
    stream!({
        yield Ok(ScanEvent::Started);

        let rows = match prepare(ctx).await {
            Ok(rows) => rows,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        let mut summary = ScanSummary {
            total: u64::try_from(rows.len()).unwrap_or(0),
            ..ScanSummary::default()
        };
        yield Ok(ScanEvent::DiscoveryComplete(summary.total));

        for row in &rows {
            let event = match process_row(ctx, row).await {
                Ok(RowOutcome::Skipped(number)) => ScanEvent::Skipped(number),
                Ok(RowOutcome::Marked(report)) => ScanEvent::Processed(report),
                Err(failure) => ScanEvent::Failed(failure),
            };
            summary.count(&event);
            yield Ok(event);
        }

        if let Some(ledger) = &ctx.ledger
            && let Err(e) = ledger.write_snapshot().await
        {
            tracing::warn!(error = ?e, "Could not write submission ledger snapshot");
        }

        yield Ok(ScanEvent::Complete(summary));
    })
}

async fn prepare(ctx: &Context) -> Result<Vec<routine_sheet::SubmissionRow>> {
    ctx.sheet.ensure_flag_column().await.or_raise(|| ErrorKind::Sheet)?;
    ctx.sheet.rows().await.or_raise(|| ErrorKind::Sheet)
}

/// Drive [`scan`] to completion, logging every event, and return the
/// summary.
pub async fn run(ctx: &Context) -> Result<ScanSummary> {
    let mut events = std::pin::pin!(scan(ctx));
    while let Some(event) = events.next().await {
        match event? {
            ScanEvent::Started => tracing::info!(sheet = ctx.sheet.name(), "Scanning submission sheet"),
            ScanEvent::DiscoveryComplete(total) => tracing::info!(rows = total, "Discovered submission rows"),
            ScanEvent::Skipped(row) => tracing::debug!(row, "Skipped processed row"),
            ScanEvent::Processed(report) => tracing::info!(
                row = report.row,
                path = %report.destination.display(),
                version = report.version,
                "Processed submission"
            ),
            ScanEvent::Failed(failure) => tracing::error!(
                row = failure.row,
                stage = %failure.stage,
                error = ?failure.error,
                "Submission failed, it will be retried on the next run"
            ),
            ScanEvent::Complete(summary) => {
                tracing::info!(
                    total = summary.total,
                    processed = summary.processed,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    failed_rows = ?summary.failed_rows,
                    "Scan complete"
                );
                return Ok(summary);
            },
        }
    }
    // The stream only ends without `Complete` after yielding an error.
    exn::bail!(ErrorKind::Sheet)
}
