//! Table scanning: buffered and streaming readers over a table's data files

mod reader;
mod stream;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::Record;

pub use self::reader::{JsonLineReader, Projection};
pub use self::stream::RecordStream;

/// Result of a buffered scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub records: Vec<Record>,
    /// More records exist past the result cap; they were not returned
    pub truncated: bool,
}

/// Bookkeeping for [`TableScanner::scan_into`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub records_added: usize,
    /// Data files opened, including one only peeked past the cap
    pub files_read: usize,
    pub truncated: bool,
}

/// Reads a table's records from disk
#[derive(Debug, Clone)]
pub struct TableScanner {
    catalog: Arc<Catalog>,
    file_suffix: String,
    max_result_size: usize,
}

impl TableScanner {
    pub fn new(catalog: Arc<Catalog>, config: &Config) -> Self {
        Self {
            catalog,
            file_suffix: config.file_suffix.clone(),
            max_result_size: config.max_result_size,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn max_result_size(&self) -> usize {
        self.max_result_size
    }

    /// Data files of a table, sorted by file name.
    pub fn table_files(&self, table: &str) -> Result<Vec<PathBuf>> {
        self.catalog.get_table(table)?;

        let dir = self.catalog.table_dir(table);
        if !dir.is_dir() {
            return Err(Error::NotFound {
                kind: "table directory",
                name: dir.display().to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))? {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let path = entry.path();
            let is_data_file = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&self.file_suffix));
            if is_data_file {
                files.push(path);
            }
        }
        files.sort();
        debug!(table, files = files.len(), "enumerated data files");
        Ok(files)
    }

    /// Buffered scan capped at `max_result_size` records.
    pub fn scan(
        &self,
        table: &str,
        columns: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> Result<ScanOutput> {
        let mut records = Vec::new();
        let summary = self.scan_into(table, columns, &mut records, cancel)?;
        Ok(ScanOutput {
            records,
            truncated: summary.truncated,
        })
    }

    /// Buffered scan into a caller-owned vector.
    ///
    /// On error the records read before the failing line stay in `out`.
    /// Once the cap is reached one more line is read to tell a table that
    /// holds exactly `max_result_size` records from a larger one.
    pub fn scan_into(
        &self,
        table: &str,
        columns: Option<&[String]>,
        out: &mut Vec<Record>,
        cancel: &CancellationToken,
    ) -> Result<ScanSummary> {
        let mut stream = self.scan_as_stream(table, columns, cancel.clone())?;
        let mut summary = ScanSummary::default();

        while summary.records_added < self.max_result_size {
            match stream.read_record()? {
                Some(record) => {
                    out.push(record);
                    summary.records_added += 1;
                }
                None => {
                    summary.files_read = stream.files_opened();
                    return Ok(summary);
                }
            }
        }

        summary.truncated = match stream.read_record() {
            Ok(None) => false,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            // Anything past the cap, even a bad line, was left unread
            Ok(Some(_)) | Err(_) => true,
        };
        summary.files_read = stream.files_opened();
        if summary.truncated {
            warn!(
                table,
                limit = self.max_result_size,
                "scan reached the result size limit, returning the first {} records",
                self.max_result_size
            );
        }
        Ok(summary)
    }

    /// Open a lazy, uncapped stream over every data file of the table.
    pub fn scan_as_stream(
        &self,
        table: &str,
        columns: Option<&[String]>,
        cancel: CancellationToken,
    ) -> Result<RecordStream> {
        let files = self.table_files(table)?;
        Ok(RecordStream::new(
            table,
            files,
            Projection::from_columns(columns),
            cancel,
        ))
    }
}
