//! Output formatting for the command-line tool

mod json;
mod terminal;

use std::io::Write;

use anyhow::Result;

use crate::config::OutputFormat;
use crate::model::{Row, TableMeta};

pub use json::JsonOutput;
pub use terminal::{write_warning, TerminalOutput};

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render sorted table names
    fn render_table_names(&self, names: &[String], writer: &mut dyn Write) -> Result<()>;

    /// Render a table's columns with their declared and SQL types
    fn render_schema(&self, table: &TableMeta, writer: &mut dyn Write) -> Result<()>;

    /// Render rows; stops at the first error. Returns the number of rows written.
    fn render_rows(
        &self,
        table: &TableMeta,
        rows: &mut dyn Iterator<Item = crate::Result<Row>>,
        writer: &mut dyn Write,
    ) -> Result<usize>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter based on format type
    pub fn create(format: OutputFormat) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Table => Box::new(TerminalOutput::new()),
            OutputFormat::Json => Box::new(JsonOutput::new()),
        }
    }
}
