//! Configuration handling for the table service

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Name of the directory under the base path that holds the descriptor
pub const METADATA_DIR: &str = "_metadata";
/// File name of the database descriptor
pub const METADATA_FILE: &str = "meta.json";

/// Default number of pending requests the dispatcher accepts
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
/// Default caller-side wait for a dispatched request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default ceiling on the records returned by a buffered scan
pub const DEFAULT_MAX_RESULT_SIZE: usize = 1024;
/// Default suffix of table data files
pub const DEFAULT_FILE_SUFFIX: &str = ".json";

/// Output format of the command-line tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// How clients reach the catalog and scanner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientMode {
    /// Every call runs directly on the caller's thread
    Embedded,
    /// Every call is queued onto the single worker
    #[default]
    Dispatched,
}

impl FromStr for ClientMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embedded" => Ok(ClientMode::Embedded),
            "dispatched" => Ok(ClientMode::Dispatched),
            _ => Err(format!("Unknown client mode: {}", s)),
        }
    }
}

/// What to do when a record lacks a declared column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingFieldPolicy {
    /// Use the type's empty value ("", 0, 0.0, false)
    #[default]
    Default,
    /// Abort the row with `Error::MissingField`
    FailFast,
}

/// Configuration for the table service
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `_metadata/meta.json` and one subdirectory per table
    pub base_path: PathBuf,
    /// Pending-request capacity of the dispatcher queue
    pub queue_capacity: usize,
    /// Caller-side timeout for dispatched requests
    pub request_timeout: Duration,
    /// Soft cap on buffered scan results
    pub max_result_size: usize,
    /// Suffix that selects data files inside a table directory
    pub file_suffix: String,
    /// Missing-field behaviour during row materialization
    pub missing_fields: MissingFieldPolicy,
    /// Which client implementation `TableService::client` hands out
    pub client_mode: ClientMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: PathBuf::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_result_size: DEFAULT_MAX_RESULT_SIZE,
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            missing_fields: MissingFieldPolicy::default(),
            client_mode: ClientMode::default(),
        }
    }
}

impl Config {
    /// Create a new Config rooted at a base directory
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    /// Path of the database descriptor file
    pub fn metadata_path(&self) -> PathBuf {
        self.base_path.join(METADATA_DIR).join(METADATA_FILE)
    }

    /// Set the dispatcher queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the caller-side request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the buffered scan result cap
    pub fn with_max_result_size(mut self, max: usize) -> Self {
        self.max_result_size = max;
        self
    }

    /// Set the data file suffix
    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    /// Set the missing-field policy
    pub fn with_missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_fields = policy;
        self
    }

    /// Set the client mode
    pub fn with_client_mode(mut self, mode: ClientMode) -> Self {
        self.client_mode = mode;
        self
    }

    /// Apply `JSONTABLE_*` environment overrides on top of the current values.
    /// Unset or unparseable variables leave the current value in place.
    pub fn with_env_overrides(mut self) -> Self {
        self.queue_capacity = read_env_usize("JSONTABLE_QUEUE_CAPACITY", self.queue_capacity);
        self.max_result_size = read_env_usize("JSONTABLE_MAX_RESULTS", self.max_result_size);
        let timeout_ms = read_env_u64(
            "JSONTABLE_TIMEOUT_MS",
            self.request_timeout.as_millis() as u64,
        );
        self.request_timeout = Duration::from_millis(timeout_ms);
        if let Some(mode) = env::var("JSONTABLE_CLIENT_MODE")
            .ok()
            .and_then(|v| v.trim().parse::<ClientMode>().ok())
        {
            self.client_mode = mode;
        }
        self
    }
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn read_env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("/data/eshop");
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.max_result_size, 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.file_suffix, ".json");
        assert_eq!(config.client_mode, ClientMode::Dispatched);
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("/data/eshop/_metadata/meta.json")
        );
    }

    #[test]
    fn test_client_mode_from_str() {
        assert_eq!("Embedded".parse::<ClientMode>(), Ok(ClientMode::Embedded));
        assert_eq!("dispatched".parse::<ClientMode>(), Ok(ClientMode::Dispatched));
        assert!("remote".parse::<ClientMode>().is_err());
    }

    #[test]
    fn test_client_mode_env_override() {
        env::set_var("JSONTABLE_CLIENT_MODE", "embedded");
        let config = Config::new("/data/eshop").with_env_overrides();
        env::remove_var("JSONTABLE_CLIENT_MODE");
        assert_eq!(config.client_mode, ClientMode::Embedded);
    }

    #[test]
    fn test_read_env_falls_back_on_garbage() {
        assert_eq!(read_env_u64("JSONTABLE_TEST_UNSET_VARIABLE", 7), 7);
    }
}
