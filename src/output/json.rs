//! JSON output format

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::adapter::SqlType;
use crate::model::{ColumnType, Row, TableMeta};

use super::OutputFormatter;

/// JSON output formatter. Rows are written one object per line.
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn write_document<T: Serialize>(&self, value: &T, writer: &mut dyn Write) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, value)?;
        } else {
            serde_json::to_writer(&mut *writer, value)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable column description
#[derive(Serialize)]
struct JsonColumn<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    column_type: ColumnType,
    sql_type: SqlType,
}

#[derive(Serialize)]
struct JsonSchema<'a> {
    table: &'a str,
    columns: Vec<JsonColumn<'a>>,
}

impl OutputFormatter for JsonOutput {
    fn render_table_names(&self, names: &[String], writer: &mut dyn Write) -> Result<()> {
        self.write_document(&names, writer)
    }

    fn render_schema(&self, table: &TableMeta, writer: &mut dyn Write) -> Result<()> {
        let schema = JsonSchema {
            table: &table.name,
            columns: table
                .columns
                .iter()
                .map(|c| JsonColumn {
                    name: &c.name,
                    column_type: c.column_type,
                    sql_type: c.column_type.sql_type(),
                })
                .collect(),
        };
        self.write_document(&schema, writer)
    }

    fn render_rows(
        &self,
        table: &TableMeta,
        rows: &mut dyn Iterator<Item = crate::Result<Row>>,
        writer: &mut dyn Write,
    ) -> Result<usize> {
        let mut count = 0;
        for row in rows {
            let row = row?;
            let object: serde_json::Map<String, serde_json::Value> = table
                .column_names()
                .zip(row.values.iter())
                .map(|(name, value)| Ok((name.to_string(), serde_json::to_value(value)?)))
                .collect::<Result<_>>()?;
            serde_json::to_writer(&mut *writer, &object)?;
            writeln!(writer)?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Value};

    #[test]
    fn test_rows_as_json_lines() {
        let table = TableMeta::new(
            "tbl_order",
            vec![
                Column::new("order_id", ColumnType::Integer),
                Column::new("amount", ColumnType::Number),
                Column::new("is_prepaid", ColumnType::Boolean),
            ],
        );
        let rows = vec![Ok(Row::new(vec![
            Value::from(10001i64),
            Value::from(27.53),
            Value::from(false),
        ]))];
        let mut out = Vec::new();
        JsonOutput::compact()
            .render_rows(&table, &mut rows.into_iter(), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"order_id\":10001,\"amount\":27.53,\"is_prepaid\":false}\n"
        );
    }

    #[test]
    fn test_table_names_compact() {
        let mut out = Vec::new();
        JsonOutput::compact()
            .render_table_names(&["a".to_string(), "b".to_string()], &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[\"a\",\"b\"]\n");
    }
}
