//! Error taxonomy for the table service

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad base path or metadata descriptor. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: &'static str, name: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record at {}:{line}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A value whose JSON kind cannot be coerced into a declared column type.
    #[error("column '{column}': cannot read a JSON {found} as {expected}")]
    UnsupportedType {
        column: String,
        expected: String,
        found: &'static str,
    },

    #[error("column '{0}' is missing from the record")]
    MissingField(String),

    #[error("request rejected: queue is at capacity ({capacity})")]
    Rejected { capacity: usize },

    #[error("request timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("request was cancelled")]
    Cancelled,

    #[error("table service has been shut down")]
    ServiceStopped,

    #[error("failed to start dispatcher worker: {0}")]
    Worker(#[source] std::io::Error),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub(crate) fn table_not_found(name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "table",
            name: name.into(),
        }
    }

    pub(crate) fn column_not_found(name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "column",
            name: name.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a caller may simply re-issue the request later.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Rejected { .. } | Error::TimedOut(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retriable_kinds() {
        assert!(Error::Rejected { capacity: 10 }.is_retriable());
        assert!(Error::TimedOut(Duration::from_secs(1)).is_retriable());
        assert!(!Error::Config("bad".into()).is_retriable());
        assert!(!Error::table_not_found("t").is_retriable());
        assert!(!Error::Cancelled.is_retriable());
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::table_not_found("missing_table");
        assert_eq!(err.to_string(), "table 'missing_table' does not exist");
    }
}
