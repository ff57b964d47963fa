//! `routine-music`: files routine music submissions from the submission
//! sheet into per-division folders.

mod cli;

use crate::cli::Cli;
use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use routine_config::{DestinationRoot, Loader, Settings};
use routine_pipeline::{Context, Destination};
use routine_sheet::{CsvSheet, SheetHandle, SubmissionLedger};
use routine_storage::BackendHandle;
use routine_storage::backend::{LocalBackend, ReadOnlyBackend};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// `exn` errors carry their whole tree in their `Debug` output.
fn report(e: impl std::fmt::Debug) -> miette::Report {
    miette!("{e:?}")
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).into_diagnostic().wrap_err_with(|| format!("invalid log level: {level}"))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}

fn backend(name: &str, root: &std::path::Path, dry_run: bool) -> Result<BackendHandle> {
    let local: BackendHandle = Arc::new(LocalBackend::new(name, root).map_err(report)?);
    Ok(match dry_run {
        true => Arc::new(ReadOnlyBackend::new(local)),
        false => local,
    })
}

fn context(settings: &Settings) -> Result<Context> {
    let source = backend("submissions", &settings.source_root, settings.dry_run)?;
    let destination = match &settings.destination {
        DestinationRoot::Dedicated(root) => backend("destination", root, settings.dry_run)?,
        DestinationRoot::SourcePool => source.clone(),
    };

    let mut sheet = CsvSheet::open(&settings.sheet, settings.worksheet.as_deref()).map_err(report)?;
    if settings.dry_run {
        sheet = sheet.read_only();
    }
    let sheet: SheetHandle = Arc::new(sheet);

    let mut ctx = Context::new(source, Destination::new(destination.clone()), sheet);
    if let Some(folder) = &settings.processed_originals {
        ctx = ctx.with_processed_originals(folder);
    }
    Ok(match settings.submission_ledger {
        true => ctx.with_ledger(SubmissionLedger::new(destination)),
        false => ctx,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Loader::new()
        .file(cli.config.clone())
        .overrides(cli.overrides())
        .load()
        .and_then(|config| config.validate())
        .map_err(report)
        .wrap_err("invalid configuration")?;
    init_logging(&settings.log_level)?;

    tracing::info!(
        sheet = %settings.sheet.display(),
        source = %settings.source_root.display(),
        destination = ?settings.destination,
        dry_run = settings.dry_run,
        "Starting routine-music v{}",
        env!("CARGO_PKG_VERSION")
    );

    let ctx = context(&settings)?;
    // Row failures are logged by the scan and retried next run; only a sheet
    // that cannot be read is fatal.
    let summary = routine_pipeline::run(&ctx).await.map_err(report)?;
    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, rows = ?summary.failed_rows, "Some submissions were not processed");
    }
    Ok(())
}
