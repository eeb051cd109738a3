//! Line-at-a-time JSON record reader

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::model::Record;

/// Set of field names kept in each record
#[derive(Debug, Clone)]
pub struct Projection {
    fields: FxHashSet<String>,
}

impl Projection {
    pub fn new(columns: &[String]) -> Self {
        Self {
            fields: columns.iter().cloned().collect(),
        }
    }

    /// `None` when every field is wanted
    pub fn from_columns(columns: Option<&[String]>) -> Option<Arc<Self>> {
        columns.map(|c| Arc::new(Self::new(c)))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Drop every field not in the projection. Runs after the full line is parsed.
    pub fn apply(&self, record: &mut Record) {
        record.retain(|key, _| self.fields.contains(key));
    }
}

/// Reads one JSON object per line from a buffered source
pub struct JsonLineReader<R> {
    reader: R,
    path: PathBuf,
    line: usize,
    projection: Option<Arc<Projection>>,
    buf: Vec<u8>,
}

impl<R: BufRead> JsonLineReader<R> {
    /// `path` only labels errors; the data comes from `reader`.
    pub fn new(reader: R, path: impl Into<PathBuf>, projection: Option<Arc<Projection>>) -> Self {
        Self {
            reader,
            path: path.into(),
            line: 0,
            projection,
            buf: Vec::new(),
        }
    }

    /// Next record, or `None` at end of input. Whitespace-only lines are skipped.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|e| Error::io(&self.path, e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // Invalid UTF-8 surfaces here as a parse error for this line
            let mut record: Record =
                serde_json::from_slice(&self.buf).map_err(|source| Error::Parse {
                    path: self.path.clone(),
                    line: self.line,
                    source,
                })?;
            if let Some(projection) = &self.projection {
                projection.apply(&mut record);
            }
            return Ok(Some(record));
        }
    }

    /// 1-based number of the last line read
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str, columns: Option<&[String]>) -> JsonLineReader<Cursor<Vec<u8>>> {
        JsonLineReader::new(
            Cursor::new(text.as_bytes().to_vec()),
            "mem.json",
            Projection::from_columns(columns),
        )
    }

    #[test]
    fn test_reads_lines_and_skips_blanks() {
        let mut r = reader("{\"a\":1}\n\n   \n{\"a\":2}", None);
        assert_eq!(r.read_record().unwrap().unwrap()["a"], 1);
        assert_eq!(r.read_record().unwrap().unwrap()["a"], 2);
        assert_eq!(r.line(), 4);
        assert!(r.read_record().unwrap().is_none());
    }

    #[test]
    fn test_projection_keeps_only_requested_fields() {
        let columns = vec!["a".to_string(), "b".to_string(), "zz".to_string()];
        let mut r = reader(
            "{\"a\":1,\"b\":\"x\",\"c\":true,\"d\":[1,2],\"e\":{\"f\":null}}\n",
            Some(&columns),
        );
        let record = r.read_record().unwrap().unwrap();
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 2);
        assert!(record.contains_key("a"));
        assert!(record.contains_key("b"));
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let mut r = reader("{\"a\":1}\n{\"a\":\n", None);
        assert!(r.read_record().unwrap().is_some());
        match r.read_record().unwrap_err() {
            Error::Parse { path, line, .. } => {
                assert_eq!(path, PathBuf::from("mem.json"));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_line_is_a_parse_error() {
        let mut bytes = b"{\"order_id\":1}\n{\"order_id\":7,\"buyer_id\":\"caf".to_vec();
        bytes.extend_from_slice(b"\xe9\"}\n{\"order_id\":8}\n");
        let mut r = JsonLineReader::new(Cursor::new(bytes), "mem.json", None);
        assert!(r.read_record().unwrap().is_some());
        assert!(matches!(r.read_record(), Err(Error::Parse { line: 2, .. })));
        assert_eq!(r.line(), 2);
    }

    #[test]
    fn test_non_object_line_is_a_parse_error() {
        let mut r = reader("[1,2,3]\n", None);
        assert!(matches!(r.read_record(), Err(Error::Parse { line: 1, .. })));
    }
}
