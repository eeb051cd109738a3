//! Sequential, forward-only reader over every data file of a table

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::model::Record;

use super::reader::{JsonLineReader, Projection};

/// Lazily parses one record at a time across the table's files, in order.
///
/// Not bounded by the buffered result cap. The first error ends the stream:
/// later calls return `None`. [`RecordStream::reset`] starts over from the
/// first file.
pub struct RecordStream {
    table: String,
    files: Vec<PathBuf>,
    next_file: usize,
    current: Option<JsonLineReader<BufReader<File>>>,
    projection: Option<Arc<Projection>>,
    cancel: CancellationToken,
    failed: bool,
}

impl RecordStream {
    pub(crate) fn new(
        table: impl Into<String>,
        files: Vec<PathBuf>,
        projection: Option<Arc<Projection>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            table: table.into(),
            files,
            next_file: 0,
            current: None,
            projection,
            cancel,
            failed: false,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of data files opened since the last reset
    pub(crate) fn files_opened(&self) -> usize {
        self.next_file
    }

    /// Token that stops this stream at the next record boundary
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Discard the position; the next read starts at the first file again.
    pub fn reset(&mut self) {
        self.next_file = 0;
        self.current = None;
        self.failed = false;
    }

    /// Next record, or `None` once every file is exhausted.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        if self.failed {
            return Ok(None);
        }
        match self.advance() {
            Ok(record) => Ok(record),
            Err(e) => {
                self.failed = true;
                self.current = None;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<Record>> {
        loop {
            self.cancel.check()?;

            if let Some(reader) = self.current.as_mut() {
                if let Some(record) = reader.read_record()? {
                    return Ok(Some(record));
                }
                self.current = None;
            }

            let Some(path) = self.files.get(self.next_file) else {
                return Ok(None);
            };
            self.next_file += 1;

            debug!(table = %self.table, file = %path.display(), "opening data file");
            let file = File::open(path).map_err(|e| Error::io(path, e))?;
            self.current = Some(JsonLineReader::new(
                BufReader::new(file),
                path.clone(),
                self.projection.clone(),
            ));
        }
    }
}

impl Iterator for RecordStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("table", &self.table)
            .field("files", &self.files)
            .field("next_file", &self.next_file)
            .field("failed", &self.failed)
            .finish()
    }
}
