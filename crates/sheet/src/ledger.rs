//! Per-division submission ledger.
//!
//! Every successfully uploaded submission is recorded in
//! `_Submitted_Music/<Division>.csv` on the destination backend, and the
//! whole ledger can be published as a single JSON snapshot.

use crate::error::{ErrorKind, Result};
use crate::source::{decode, encode};
use exn::ResultExt;
use routine_storage::error::ErrorKind as StorageErrorKind;
use routine_storage::{BackendHandle, validate_path};
use serde::Serialize;
use std::cmp::Reverse;
use std::ops::Deref;
use std::path::{Path, PathBuf};

pub const LEDGER_FOLDER: &str = "_Submitted_Music";
pub const LEDGER_HEADERS: [&str; 6] = ["Timestamp", "Partnership", "Division", "Routine Name", "Descriptor", "Version"];
pub const SNAPSHOT_FILE: &str = "submitted_music.json";
const UNKNOWN_DIVISION: &str = "UnknownDivision";

const PARTNERSHIP: usize = 1;
const VERSION: usize = 5;

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub timestamp: String,
    pub partnership: String,
    pub division: String,
    pub routine_name: String,
    pub descriptor: String,
    pub version: u32,
}
impl LedgerEntry {
    fn cells(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.partnership.clone(),
            self.division.trim().to_string(),
            self.routine_name.trim().to_string(),
            self.descriptor.trim().to_string(),
            self.version.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub divisions: Vec<DivisionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivisionSnapshot {
    pub division: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

/// Partnership (case-insensitive) ascending, then version descending.
fn sort_entries(rows: &mut [Vec<String>]) {
    rows.sort_by_cached_key(|row| {
        let partnership = row.get(PARTNERSHIP).map(|p| p.trim().to_lowercase()).unwrap_or_default();
        let version = row.get(VERSION).and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(0);
        (partnership, Reverse(version))
    });
}

pub struct SubmissionLedger {
    backend: BackendHandle,
    folder: PathBuf,
}
impl SubmissionLedger {
    pub fn new(backend: BackendHandle) -> Self {
        Self {
            backend,
            folder: PathBuf::from(LEDGER_FOLDER),
        }
    }

    /// Location of a division's tab.
    pub fn tab_path(&self, division: &str) -> Result<PathBuf> {
        let division = match division.trim() {
            "" => UNKNOWN_DIVISION,
            division => division,
        };
        let path = self.folder.join(format!("{division}.csv"));
        match validate_path(&path) {
            Ok(valid) if valid.parent() == Some(self.folder.as_path()) => Ok(valid),
            _ => exn::bail!(ErrorKind::Storage),
        }
    }

    async fn read_tab(&self, path: &Path) -> Result<Option<Vec<Vec<String>>>> {
        match self.backend.read(path).await {
            Ok(data) => Ok(Some(decode(data.as_slice()).or_raise(|| ErrorKind::Encoding)?)),
            Err(e) if matches!(e.deref(), StorageErrorKind::NotFound(_)) => Ok(None),
            Err(e) => Err(e).or_raise(|| ErrorKind::Storage),
        }
    }

    /// Append `entry` to its division's tab, creating the tab (with headers)
    /// if needed, and re-sort the tab.
    pub async fn record(&self, entry: &LedgerEntry) -> Result<PathBuf> {
        let path = self.tab_path(&entry.division)?;
        let mut records = self.read_tab(&path).await?.unwrap_or_default();

        let headers: Vec<String> = LEDGER_HEADERS.iter().map(|h| h.to_string()).collect();
        match records.first_mut() {
            Some(first) if first.get(..LEDGER_HEADERS.len()) == Some(headers.as_slice()) => {},
            Some(first) => {
                let rest = first.split_off(first.len().min(LEDGER_HEADERS.len()));
                *first = headers;
                first.extend(rest);
            },
            None => records.push(headers),
        }
        records.push(entry.cells());

        let mut rows: Vec<_> = records.split_off(1).into_iter().filter(|row| !is_blank(row)).collect();
        sort_entries(&mut rows);
        records.extend(rows);

        let data = encode(Vec::new(), &records).or_raise(|| ErrorKind::Encoding)?;
        self.backend.write(&path, &data).await.or_raise(|| ErrorKind::Storage)?;
        tracing::debug!(path = %path.display(), version = entry.version, "Recorded submission in ledger");
        Ok(path)
    }

    /// Collect every tab of the ledger. Tabs without data rows are left out,
    /// rows are padded or truncated to the header width. A tab that cannot
    /// be read is logged and skipped.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let mut tabs: Vec<_> = self
            .backend
            .list(Some(self.folder.as_path()))
            .await
            .or_raise(|| ErrorKind::Storage)?
            .into_iter()
            .filter(|file| file.is_child_of(&self.folder))
            .filter(|file| file.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
            .map(|file| file.path)
            .collect();
        tabs.sort();

        let mut snapshot = Snapshot::default();
        for path in tabs {
            let records = match self.read_tab(&path).await {
                Ok(Some(records)) => records,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = ?e, "Could not read ledger tab for snapshot");
                    continue;
                },
            };
            let mut records = records.into_iter();
            let Some(headers) = records.next() else {
                continue;
            };
            let width = headers.len();
            let rows: Vec<Vec<String>> = records
                .filter(|row| !is_blank(row))
                .map(|mut row| {
                    row.resize(width, String::new());
                    row
                })
                .collect();
            if rows.is_empty() {
                continue;
            }
            let division = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().trim().to_string())
                .filter(|stem| !stem.is_empty())
                .unwrap_or_else(|| UNKNOWN_DIVISION.to_string());
            snapshot.divisions.push(DivisionSnapshot { division, headers, rows });
        }
        Ok(snapshot)
    }

    /// Write [`snapshot()`](Self::snapshot) as JSON next to the ledger tabs.
    pub async fn write_snapshot(&self) -> Result<PathBuf> {
        let snapshot = self.snapshot().await?;
        let data = serde_json::to_vec_pretty(&snapshot).or_raise(|| ErrorKind::Encoding)?;
        let path = self.folder.join(SNAPSHOT_FILE);
        self.backend.write(&path, &data).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(path = %path.display(), divisions = snapshot.divisions.len(), "Wrote submission ledger snapshot");
        Ok(path)
    }
}
