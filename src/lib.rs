//! jsontable - embedded table service over newline-delimited JSON
//!
//! A base directory holds a descriptor at `_metadata/meta.json` and one
//! subdirectory of `*.json` files per table. The service loads the descriptor
//! once into a read-only [`Catalog`], scans table files into typed rows, and
//! serializes every request onto a single worker with bounded queueing,
//! caller timeouts and cooperative cancellation.

pub mod adapter;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod materialize;
pub mod model;
pub mod output;
pub mod scan;
pub mod service;

#[cfg(test)]
pub(crate) mod test_util;

pub use cancel::CancellationToken;
pub use catalog::Catalog;
pub use config::Config;
pub use dispatch::RequestDispatcher;
pub use error::{Error, Result};
pub use model::{Row, RowSet, TableMeta, Value};
pub use service::{TableClient, TableService};
