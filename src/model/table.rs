//! Records, typed values and rows

use std::borrow::Cow;

use serde::Serialize;

use super::schema::{ColumnType, TableMeta};

/// One parsed JSON object line, before materialization
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A typed cell value
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// The column type this value belongs to
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Integer(_) => ColumnType::Integer,
            Value::Number(_) => ColumnType::Number,
            Value::String(_) => ColumnType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to a display string
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Value::Boolean(b) => Cow::Owned(b.to_string()),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Number(f) => Cow::Owned(f.to_string()),
            Value::String(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// A positional row, one value per selected column
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get a value by column position
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A buffered scan result: the table, the columns the rows were built for, and the rows
#[derive(Debug, Clone)]
pub struct RowSet {
    /// Table metadata restricted to the materialized columns, in catalog order
    pub table: TableMeta,
    pub rows: Vec<Row>,
    /// True when the scan stopped at the result cap
    pub truncated: bool,
}

impl RowSet {
    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Value at a row position for a named column
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col_idx = self.table.column_index(column)?;
        self.rows.get(row)?.get(col_idx)
    }
}
