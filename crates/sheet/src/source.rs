//! Row source and sink.

use crate::error::{ErrorKind, Result};
use crate::row::{FIRST_DATA_ROW, FLAG_COLUMN, FORM_COLUMNS, ProcessedFlag, SubmissionRow};
use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use exn::{OptionExt, ResultExt};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SheetHandle = Arc<dyn RowSource + Send + Sync>;

/// Where submission rows come from, and where their processed flag goes.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Name of the sheet, used for logging only.
    fn name(&self) -> &str;

    /// Make sure the sheet has room for the processed flag: a sheet exactly
    /// [`FORM_COLUMNS`] wide gets one blank column appended.
    async fn ensure_flag_column(&self) -> Result<()>;

    /// Every data row (the header row is excluded), in sheet order. Rows
    /// with no content at all are left out; row numbers are unaffected.
    async fn rows(&self) -> Result<Vec<SubmissionRow>>;

    /// Set the processed flag of a single row.
    async fn write_flag(&self, row: u32, flag: ProcessedFlag) -> Result<()>;
}

pub(crate) fn rows_from_records(records: Vec<Vec<String>>) -> Vec<SubmissionRow> {
    records
        .into_iter()
        .zip(1u32..)
        .filter(|(_, number)| *number >= FIRST_DATA_ROW)
        .map(|(cells, number)| SubmissionRow::new(number, cells))
        .filter(|row| !row.is_blank())
        .collect()
}

/// Returns `true` if the records were changed.
pub(crate) fn add_flag_column(records: &mut [Vec<String>]) -> bool {
    if records.iter().map(Vec::len).max() != Some(FORM_COLUMNS) {
        return false;
    }
    for record in records.iter_mut().filter(|record| record.len() == FORM_COLUMNS) {
        record.push(String::new());
    }
    true
}

pub(crate) fn set_flag(records: &mut [Vec<String>], row: u32, flag: ProcessedFlag) -> Result<()> {
    let record = match usize::try_from(row) {
        Ok(number) if row >= FIRST_DATA_ROW => records.get_mut(number - 1),
        _ => None,
    };
    let Some(record) = record else {
        exn::bail!(ErrorKind::RowOutOfRange(row));
    };
    if record.len() <= FLAG_COLUMN {
        record.resize(FLAG_COLUMN + 1, String::new());
    }
    record[FLAG_COLUMN] = flag.as_cell().to_string();
    Ok(())
}

pub(crate) fn decode(reader: impl std::io::Read) -> std::result::Result<Vec<Vec<String>>, csv::Error> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
        .records()
        .map(|record| record.map(|record| record.iter().map(str::to_string).collect()))
        .collect()
}

pub(crate) fn encode<W: std::io::Write>(writer: W, records: &[Vec<String>]) -> std::result::Result<W, std::io::Error> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);
    for record in records {
        writer.write_record(record)?;
    }
    writer.into_inner().map_err(|e| e.into_error())
}

/// A submission sheet stored as CSV.
///
/// The location is either a single CSV file (a workbook with one tab) or a
/// workbook directory holding one `<tab>.csv` file per worksheet; without
/// a worksheet name the first tab in name order is used. Reads and writes
/// run on the blocking thread pool, writes replace the file atomically.
pub struct CsvSheet {
    name: String,
    path: PathBuf,
    read_only: bool,
    lock: Mutex<()>,
}
impl CsvSheet {
    pub fn open(location: impl AsRef<Path>, worksheet: Option<&str>) -> Result<Self> {
        let location = location.as_ref();
        let path = if location.is_dir() {
            match worksheet {
                Some(tab) => location.join(format!("{tab}.csv")),
                None => first_tab(location)?,
            }
        } else {
            match worksheet {
                Some(tab) if location.file_stem() != Some(OsStr::new(tab)) => {
                    location.with_file_name(format!("{tab}.csv"))
                },
                _ => location.to_path_buf(),
            }
        };
        if !path.is_file() {
            exn::bail!(ErrorKind::WorksheetNotFound(path));
        }
        let name = path.file_stem().map(|stem| stem.to_string_lossy().to_string()).unwrap_or_default();
        tracing::debug!(sheet = %name, path = %path.display(), "Opened submission sheet");
        Ok(Self {
            name,
            path,
            read_only: false,
            lock: Mutex::new(()),
        })
    }

    /// Never write to the sheet; flag writes are logged and skipped.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Vec<String>>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&path).or_raise(|| ErrorKind::Read)?;
            decode(file).or_raise(|| ErrorKind::Read)
        })
        .await
        .or_raise(|| ErrorKind::Read)?
    }

    async fn store(&self, records: Vec<Vec<String>>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file = tempfile::NamedTempFile::new_in(dir).or_raise(|| ErrorKind::Write)?;
            let file = encode(file, &records).or_raise(|| ErrorKind::Write)?;
            file.persist(&path).or_raise(|| ErrorKind::Write)?;
            Ok(())
        })
        .await
        .or_raise(|| ErrorKind::Write)?
    }
}

fn first_tab(workbook: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(workbook).or_raise(|| ErrorKind::Read)?;
    let mut tabs = Vec::new();
    for entry in entries {
        let path = entry.or_raise(|| ErrorKind::Read)?.path();
        let is_csv = path.extension().and_then(OsStr::to_str).is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            tabs.push(path);
        }
    }
    tabs.into_iter().min().ok_or_raise(|| ErrorKind::WorksheetNotFound(workbook.to_path_buf()))
}

#[async_trait]
impl RowSource for CsvSheet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_flag_column(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if !add_flag_column(&mut records) {
            return Ok(());
        }
        if self.read_only {
            tracing::info!(sheet = %self.name, "Dry run: skipping flag column creation");
            return Ok(());
        }
        tracing::info!(sheet = %self.name, "Added processed flag column");
        self.store(records).await
    }

    async fn rows(&self) -> Result<Vec<SubmissionRow>> {
        let _guard = self.lock.lock().await;
        Ok(rows_from_records(self.load().await?))
    }

    async fn write_flag(&self, row: u32, flag: ProcessedFlag) -> Result<()> {
        if self.read_only {
            tracing::info!(sheet = %self.name, row, flag = flag.as_cell(), "Dry run: skipping flag write");
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        set_flag(&mut records, row, flag)?;
        self.store(records).await
    }
}
