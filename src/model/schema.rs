//! Database, table and column metadata

use serde::{Deserialize, Serialize};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// Text
    String,
    Boolean,
    /// General floating-point numeric
    Number,
    /// Precise integer subset of NUMBER
    Integer,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::String => write!(f, "STRING"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Number => write!(f, "NUMBER"),
            ColumnType::Integer => write!(f, "INTEGER"),
        }
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A table and its ordered columns. Column order fixes row positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<Column>,
}

impl TableMeta {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// The whole database as declared by its descriptor file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_deserializes() {
        let json = r#"{
            "name": "eshop",
            "tables": [{
                "name": "tbl_order",
                "columns": [
                    {"name": "order_id", "type": "INTEGER"},
                    {"name": "buyer_id", "type": "STRING"},
                    {"name": "amount", "type": "NUMBER"},
                    {"name": "is_prepaid", "type": "BOOLEAN"}
                ]
            }]
        }"#;
        let db: Database = serde_json::from_str(json).unwrap();
        assert_eq!(db.name, "eshop");
        let table = &db.tables[0];
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.column_index("amount"), Some(2));
        assert_eq!(
            table.column("is_prepaid").map(|c| c.column_type),
            Some(ColumnType::Boolean)
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"name": "c", "type": "ARRAY"}"#;
        assert!(serde_json::from_str::<Column>(json).is_err());
    }
}
