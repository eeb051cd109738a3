//! Data model for catalog metadata and scanned rows

mod schema;
mod table;

pub use schema::{Column, ColumnType, Database, TableMeta};
pub use table::{Record, Row, RowSet, Value};
