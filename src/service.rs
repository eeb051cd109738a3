//! Client-facing table service.
//!
//! [`TableClient`] is the one capability set the relational layer consumes.
//! Two implementations sit behind it: [`EmbeddedClient`] runs every call on
//! the caller's thread, [`DispatchedClient`] funnels every call through the
//! single-worker [`RequestDispatcher`] with a timeout. [`TableService`] owns
//! the catalog and the dispatcher and hands out either kind.

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::catalog::Catalog;
use crate::config::{ClientMode, Config, MissingFieldPolicy};
use crate::dispatch::RequestDispatcher;
use crate::error::{Error, Result};
use crate::materialize::RowMaterializer;
use crate::model::{Database, Row, RowSet, TableMeta};
use crate::scan::{RecordStream, ScanOutput, TableScanner};

/// Catalog lookup and scan operations
pub trait TableClient: Send + Sync {
    /// Full metadata snapshot
    fn database_meta(&self) -> Result<Database>;

    /// Sorted table names containing `pattern`; all names for `None`
    fn list_table_names(&self, pattern: Option<&str>) -> Result<Vec<String>>;

    /// Same filter and order as `list_table_names`, full metadata
    fn list_tables(&self, pattern: Option<&str>) -> Result<Vec<TableMeta>>;

    /// Exact-name lookup
    fn get_table(&self, name: &str) -> Result<TableMeta>;

    /// Raw, optionally projected records; capped like `scan_table`
    fn scan_records(&self, name: &str, columns: Option<&[String]>) -> Result<ScanOutput>;

    /// Buffered typed rows
    fn scan_table(&self, name: &str, columns: Option<&[String]>) -> Result<RowSet>;

    /// Lazy typed rows, read on the caller's thread
    fn scan_table_as_stream(&self, name: &str, columns: Option<&[String]>) -> Result<RowStream>;
}

/// Lazily materialized rows over a [`RecordStream`]
#[derive(Debug)]
pub struct RowStream {
    table: TableMeta,
    records: RecordStream,
    materializer: RowMaterializer,
}

impl RowStream {
    /// Table metadata restricted to the streamed columns
    pub fn table(&self) -> &TableMeta {
        &self.table
    }

    /// Restart from the first record of the first file.
    pub fn reset(&mut self) {
        self.records.reset();
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        self.records.cancel_token()
    }
}

impl Iterator for RowStream {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        Some(self.materializer.materialize(&record))
    }
}

/// The work behind both clients
#[derive(Debug)]
struct TableEngine {
    catalog: Arc<Catalog>,
    scanner: TableScanner,
    missing_fields: MissingFieldPolicy,
}

impl TableEngine {
    fn new(catalog: Arc<Catalog>, config: &Config) -> Self {
        Self {
            scanner: TableScanner::new(catalog.clone(), config),
            catalog,
            missing_fields: config.missing_fields,
        }
    }

    fn get_table(&self, name: &str) -> Result<TableMeta> {
        self.catalog.get_table(name).cloned()
    }

    /// The table restricted to `columns`, kept in catalog order.
    fn select_columns(&self, name: &str, columns: Option<&[String]>) -> Result<TableMeta> {
        let table = self.catalog.get_table(name)?;
        let Some(columns) = columns else {
            return Ok(table.clone());
        };
        if let Some(unknown) = columns.iter().find(|c| table.column(c).is_none()) {
            return Err(Error::column_not_found(format!("{}.{}", name, unknown)));
        }
        let selected = table
            .columns
            .iter()
            .filter(|c| columns.contains(&c.name))
            .cloned()
            .collect();
        Ok(TableMeta::new(table.name.clone(), selected))
    }

    fn scan_records(
        &self,
        name: &str,
        columns: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> Result<ScanOutput> {
        self.scanner.scan(name, columns, cancel)
    }

    fn scan_table(
        &self,
        name: &str,
        columns: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> Result<RowSet> {
        let table = self.select_columns(name, columns)?;
        let projection: Vec<String> = table.column_names().map(str::to_string).collect();
        let output = self.scanner.scan(name, Some(&projection), cancel)?;

        let materializer = RowMaterializer::for_table(&table, self.missing_fields);
        let rows = output
            .records
            .iter()
            .map(|record| materializer.materialize(record))
            .collect::<Result<Vec<_>>>()?;

        Ok(RowSet {
            table,
            rows,
            truncated: output.truncated,
        })
    }

    fn scan_table_as_stream(
        &self,
        name: &str,
        columns: Option<&[String]>,
        cancel: CancellationToken,
    ) -> Result<RowStream> {
        let table = self.select_columns(name, columns)?;
        let projection: Vec<String> = table.column_names().map(str::to_string).collect();
        let records = self.scanner.scan_as_stream(name, Some(&projection), cancel)?;
        Ok(RowStream {
            materializer: RowMaterializer::for_table(&table, self.missing_fields),
            table,
            records,
        })
    }
}

/// Direct, in-process client
#[derive(Debug, Clone)]
pub struct EmbeddedClient {
    engine: Arc<TableEngine>,
}

impl TableClient for EmbeddedClient {
    fn database_meta(&self) -> Result<Database> {
        Ok(self.engine.catalog.database().clone())
    }

    fn list_table_names(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        Ok(self.engine.catalog.list_table_names(pattern))
    }

    fn list_tables(&self, pattern: Option<&str>) -> Result<Vec<TableMeta>> {
        Ok(self.engine.catalog.list_tables(pattern))
    }

    fn get_table(&self, name: &str) -> Result<TableMeta> {
        self.engine.get_table(name)
    }

    fn scan_records(&self, name: &str, columns: Option<&[String]>) -> Result<ScanOutput> {
        self.engine
            .scan_records(name, columns, &CancellationToken::new())
    }

    fn scan_table(&self, name: &str, columns: Option<&[String]>) -> Result<RowSet> {
        self.engine.scan_table(name, columns, &CancellationToken::new())
    }

    fn scan_table_as_stream(&self, name: &str, columns: Option<&[String]>) -> Result<RowStream> {
        self.engine
            .scan_table_as_stream(name, columns, CancellationToken::new())
    }
}

/// Client whose every call is queued onto the dispatcher's worker
#[derive(Debug, Clone)]
pub struct DispatchedClient {
    engine: Arc<TableEngine>,
    dispatcher: Arc<RequestDispatcher>,
    timeout: Duration,
}

impl DispatchedClient {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn call<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&TableEngine, &CancellationToken) -> Result<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        self.dispatcher
            .query(self.timeout, move |cancel| op(&engine, cancel))
    }
}

fn owned_columns(columns: Option<&[String]>) -> Option<Vec<String>> {
    columns.map(<[String]>::to_vec)
}

impl TableClient for DispatchedClient {
    fn database_meta(&self) -> Result<Database> {
        self.call(|engine, _| Ok(engine.catalog.database().clone()))
    }

    fn list_table_names(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.map(str::to_string);
        self.call(move |engine, _| Ok(engine.catalog.list_table_names(pattern.as_deref())))
    }

    fn list_tables(&self, pattern: Option<&str>) -> Result<Vec<TableMeta>> {
        let pattern = pattern.map(str::to_string);
        self.call(move |engine, _| Ok(engine.catalog.list_tables(pattern.as_deref())))
    }

    fn get_table(&self, name: &str) -> Result<TableMeta> {
        let name = name.to_string();
        self.call(move |engine, _| engine.get_table(&name))
    }

    fn scan_records(&self, name: &str, columns: Option<&[String]>) -> Result<ScanOutput> {
        let name = name.to_string();
        let columns = owned_columns(columns);
        self.call(move |engine, cancel| engine.scan_records(&name, columns.as_deref(), cancel))
    }

    fn scan_table(&self, name: &str, columns: Option<&[String]>) -> Result<RowSet> {
        let name = name.to_string();
        let columns = owned_columns(columns);
        self.call(move |engine, cancel| engine.scan_table(&name, columns.as_deref(), cancel))
    }

    fn scan_table_as_stream(&self, name: &str, columns: Option<&[String]>) -> Result<RowStream> {
        let name = name.to_string();
        let columns = owned_columns(columns);
        // Opened on the worker; reading happens on the caller's thread.
        self.call(move |engine, _| {
            engine.scan_table_as_stream(&name, columns.as_deref(), CancellationToken::new())
        })
    }
}

/// Owns the catalog and the dispatcher for one base directory
#[derive(Debug)]
pub struct TableService {
    config: Config,
    engine: Arc<TableEngine>,
    dispatcher: Arc<RequestDispatcher>,
}

impl TableService {
    /// Load the catalog and start the dispatcher. A bad base path or
    /// descriptor fails here with `Error::Config`.
    pub fn open(config: Config) -> Result<Self> {
        let catalog = Arc::new(Catalog::load(&config.base_path)?);
        let engine = Arc::new(TableEngine::new(catalog, &config));
        let dispatcher = Arc::new(RequestDispatcher::start(config.queue_capacity)?);
        Ok(Self {
            config,
            engine,
            dispatcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.engine.catalog
    }

    pub fn dispatcher(&self) -> &Arc<RequestDispatcher> {
        &self.dispatcher
    }

    /// A client of the kind selected by `Config::client_mode`
    pub fn client(&self) -> Box<dyn TableClient> {
        match self.config.client_mode {
            ClientMode::Embedded => Box::new(self.embedded_client()),
            ClientMode::Dispatched => Box::new(self.dispatched_client()),
        }
    }

    pub fn embedded_client(&self) -> EmbeddedClient {
        EmbeddedClient {
            engine: self.engine.clone(),
        }
    }

    pub fn dispatched_client(&self) -> DispatchedClient {
        DispatchedClient {
            engine: self.engine.clone(),
            dispatcher: self.dispatcher.clone(),
            timeout: self.config.request_timeout,
        }
    }

    /// Drain queued requests and stop the worker. Dispatched clients fail
    /// with `Error::ServiceStopped` afterwards.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}
