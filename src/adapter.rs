//! Glue for a relational query layer: SQL types and a row cursor

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{ColumnType, Row, RowSet, TableMeta};

/// SQL type a column is exposed as. Every column is nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Varchar,
    Boolean,
    Double,
    Integer,
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Varchar => write!(f, "VARCHAR"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Double => write!(f, "DOUBLE"),
            SqlType::Integer => write!(f, "INTEGER"),
        }
    }
}

impl ColumnType {
    pub fn sql_type(self) -> SqlType {
        match self {
            ColumnType::String => SqlType::Varchar,
            ColumnType::Boolean => SqlType::Boolean,
            ColumnType::Number => SqlType::Double,
            ColumnType::Integer => SqlType::Integer,
        }
    }
}

/// One field of a row type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowField {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
}

/// Ordered struct type describing a table's rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowType {
    pub fields: Vec<RowField>,
}

impl RowType {
    pub fn of(table: &TableMeta) -> Self {
        Self {
            fields: table
                .columns
                .iter()
                .map(|c| RowField {
                    name: c.name.clone(),
                    sql_type: c.column_type.sql_type(),
                    nullable: true,
                })
                .collect(),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Forward cursor over buffered rows: `move_next` then `current`.
#[derive(Debug)]
pub struct RowCursor {
    rows: Option<Vec<Row>>,
    index: Option<usize>,
}

impl RowCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Some(rows),
            index: None,
        }
    }

    /// Advance; false once past the last row.
    pub fn move_next(&mut self) -> bool {
        let len = self.rows.as_ref().map_or(0, Vec::len);
        let next = self.index.map_or(0, |i| i + 1);
        if next < len {
            self.index = Some(next);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Result<&Row> {
        let rows = self
            .rows
            .as_ref()
            .ok_or(Error::InvalidState("cursor is closed"))?;
        let index = self
            .index
            .ok_or(Error::InvalidState("move_next() must be called before current()"))?;
        rows.get(index)
            .ok_or(Error::InvalidState("cursor is past the last row"))
    }

    /// Back to before the first row
    pub fn reset(&mut self) {
        self.index = None;
    }

    /// Release the rows; the cursor yields nothing afterwards.
    pub fn close(&mut self) {
        self.rows = None;
        self.index = None;
    }
}

impl From<RowSet> for RowCursor {
    fn from(set: RowSet) -> Self {
        Self::new(set.rows)
    }
}
