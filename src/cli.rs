use clap::Parser;
use routine_config::Config;
use std::path::PathBuf;

/// File routine music submissions: rename, tag and flag every new row of
/// the submission sheet.
#[derive(Debug, Parser)]
#[command(name = "routine-music", version, about)]
pub(crate) struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to `config.toml` in
    /// the platform config directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Submission sheet: a CSV file, or a directory of `<tab>.csv` files.
    #[arg(long, value_name = "PATH")]
    pub sheet: Option<PathBuf>,
    /// Worksheet (tab) to read when the sheet is a directory.
    #[arg(long, value_name = "NAME")]
    pub worksheet: Option<String>,
    /// Folder the submitted audio files are uploaded to.
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,
    /// Root folder for the per-division folders. Defaults to the source folder.
    #[arg(long, value_name = "PATH")]
    pub destination: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `routine_pipeline=trace`.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
    /// Read everything, change nothing.
    #[arg(long)]
    pub dry_run: bool,
    /// Do not maintain the `_Submitted_Music` ledger.
    #[arg(long)]
    pub no_ledger: bool,
    /// Folder in the source pool for originals that cannot be deleted.
    #[arg(long, value_name = "PATH")]
    pub processed_originals: Option<PathBuf>,
}
impl Cli {
    /// Flags that were actually given, as the highest-precedence config layer.
    pub(crate) fn overrides(&self) -> Config {
        Config {
            submission_sheet_id: self.sheet.clone(),
            worksheet_name: self.worksheet.clone(),
            submissions_folder_id: self.source.clone(),
            dest_root_folder_id: self.destination.clone(),
            log_level: self.log_level.clone(),
            dry_run: self.dry_run.then_some(true),
            submission_ledger: self.no_ledger.then_some(false),
            processed_originals_folder: self.processed_originals.clone(),
        }
    }
}
