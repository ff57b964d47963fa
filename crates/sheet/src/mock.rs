//! In-memory row source for testing.

use crate::error::{ErrorKind, Result};
use crate::row::{ProcessedFlag, SubmissionRow};
use crate::source::{RowSource, add_flag_column, rows_from_records, set_flag};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// In-memory row source for testing.
///
/// Holds the whole sheet (header row included) as cells. Every flag write
/// is journaled, including rejected ones.
#[derive(Debug, Default)]
pub struct MemorySheet {
    records: Mutex<Vec<Vec<String>>>,
    flag_writes: Mutex<Vec<(u32, ProcessedFlag)>>,
    fail_flag_writes: bool,
}
impl MemorySheet {
    pub fn new(records: impl IntoIterator<Item = impl IntoIterator<Item = impl Into<String>>>) -> Self {
        Self {
            records: Mutex::new(
                records.into_iter().map(|record| record.into_iter().map(Into::into).collect()).collect(),
            ),
            ..Self::default()
        }
    }

    /// Reject every flag write.
    pub fn fail_flag_writes(mut self) -> Self {
        self.fail_flag_writes = true;
        self
    }

    /// Every attempted flag write, in call order.
    pub fn flag_writes(&self) -> Vec<(u32, ProcessedFlag)> {
        self.flag_writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Current cells of the whole sheet.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl RowSource for MemorySheet {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_flag_column(&self) -> Result<()> {
        add_flag_column(&mut self.records.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(())
    }

    async fn rows(&self) -> Result<Vec<SubmissionRow>> {
        Ok(rows_from_records(self.records()))
    }

    async fn write_flag(&self, row: u32, flag: ProcessedFlag) -> Result<()> {
        self.flag_writes.lock().unwrap_or_else(PoisonError::into_inner).push((row, flag));
        if self.fail_flag_writes {
            exn::bail!(ErrorKind::Write);
        }
        set_flag(&mut self.records.lock().unwrap_or_else(PoisonError::into_inner), row, flag)
    }
}
