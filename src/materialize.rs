//! Conversion of raw records into positional, typed rows

use serde_json::Value as Json;

use crate::config::MissingFieldPolicy;
use crate::error::{Error, Result};
use crate::model::{Column, ColumnType, Record, Row, TableMeta, Value};

/// Builds rows for a fixed, ordered column list
#[derive(Debug, Clone)]
pub struct RowMaterializer {
    columns: Vec<Column>,
    missing_fields: MissingFieldPolicy,
}

impl RowMaterializer {
    pub fn new(columns: Vec<Column>, missing_fields: MissingFieldPolicy) -> Self {
        Self {
            columns,
            missing_fields,
        }
    }

    /// Materializer for every column of a table
    pub fn for_table(table: &TableMeta, missing_fields: MissingFieldPolicy) -> Self {
        Self::new(table.columns.clone(), missing_fields)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// One value per column, in column order, whatever the record holds.
    pub fn materialize(&self, record: &Record) -> Result<Row> {
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = match record.get(&column.name) {
                Some(json) => coerce(column, json)?,
                None => match self.missing_fields {
                    MissingFieldPolicy::Default => empty_value(column.column_type),
                    MissingFieldPolicy::FailFast => {
                        return Err(Error::MissingField(column.name.clone()))
                    }
                },
            };
            values.push(value);
        }
        Ok(Row::new(values))
    }
}

/// The value a missing field resolves to
pub fn empty_value(column_type: ColumnType) -> Value {
    match column_type {
        ColumnType::String => Value::String(String::new()),
        ColumnType::Boolean => Value::Boolean(false),
        ColumnType::Number => Value::Number(0.0),
        ColumnType::Integer => Value::Integer(0),
    }
}

/// Coerce one JSON value into the column's declared type.
pub fn coerce(column: &Column, json: &Json) -> Result<Value> {
    let unsupported = |found| Error::UnsupportedType {
        column: column.name.clone(),
        expected: column.column_type.to_string(),
        found,
    };

    match json {
        Json::Null => return Err(unsupported("null")),
        Json::Array(_) => return Err(unsupported("array")),
        Json::Object(_) => return Err(unsupported("object")),
        _ => {}
    }

    let value = match column.column_type {
        ColumnType::String => Value::String(match json {
            Json::String(s) => s.clone(),
            other => other.to_string(),
        }),
        ColumnType::Number => Value::Number(match json {
            Json::Number(n) => n.as_f64().unwrap_or(0.0),
            Json::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Json::Bool(b) => f64::from(u8::from(*b)),
            _ => 0.0,
        }),
        ColumnType::Integer => Value::Integer(match json {
            Json::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Json::String(s) => parse_integer(s),
            Json::Bool(b) => i64::from(*b),
            _ => 0,
        }),
        ColumnType::Boolean => Value::Boolean(match json {
            Json::Bool(b) => *b,
            Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Json::String(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }),
    };
    Ok(value)
}

/// Integer text first, then truncated float text, else 0
fn parse_integer(s: &str) -> i64 {
    let trimmed = s.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
        .unwrap_or(0)
}
