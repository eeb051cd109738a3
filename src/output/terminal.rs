//! Terminal output: boxed tables

use std::io::Write;

use anyhow::Result;
use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::model::{Row, TableMeta};

use super::OutputFormatter;

/// Terminal output rendered with `tabled`
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TerminalOutput {
    fn render_table_names(&self, names: &[String], writer: &mut dyn Write) -> Result<()> {
        for name in names {
            writeln!(writer, "{}", name)?;
        }
        Ok(())
    }

    fn render_schema(&self, table: &TableMeta, writer: &mut dyn Write) -> Result<()> {
        let mut builder = Builder::default();
        builder.push_record(["column".to_string(), "type".to_string(), "sql type".to_string()]);
        for column in &table.columns {
            builder.push_record([
                column.name.clone(),
                column.column_type.to_string(),
                column.column_type.sql_type().to_string(),
            ]);
        }
        writeln!(writer, "{}", table.name)?;
        writeln!(writer, "{}", build_table(builder))?;
        Ok(())
    }

    fn render_rows(
        &self,
        table: &TableMeta,
        rows: &mut dyn Iterator<Item = crate::Result<Row>>,
        writer: &mut dyn Write,
    ) -> Result<usize> {
        let mut builder = Builder::default();
        builder.push_record(table.column_names().map(str::to_string));

        let mut count = 0;
        for row in rows {
            let row = row?;
            builder.push_record(row.values.iter().map(|v| v.display().into_owned()));
            count += 1;
        }

        writeln!(writer, "{}", build_table(builder))?;
        writeln!(writer, "({} row{})", count, if count == 1 { "" } else { "s" })?;
        Ok(count)
    }
}

fn build_table(builder: Builder) -> String {
    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

/// Print a highlighted warning line to stderr
pub fn write_warning(message: &str) -> Result<()> {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    write!(stderr, "warning:")?;
    stderr.reset()?;
    writeln!(stderr, " {}", message)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnType, Value};

    fn table() -> TableMeta {
        TableMeta::new(
            "tbl_order",
            vec![
                Column::new("order_id", ColumnType::Integer),
                Column::new("buyer_id", ColumnType::String),
            ],
        )
    }

    #[test]
    fn test_render_rows() {
        let rows = vec![
            Ok(Row::new(vec![Value::from(10001i64), Value::from("u234152")])),
            Ok(Row::new(vec![Value::from(10002i64), Value::from("u100231")])),
        ];
        let mut out = Vec::new();
        let count = TerminalOutput::new()
            .render_rows(&table(), &mut rows.into_iter(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(count, 2);
        assert!(text.contains("order_id"));
        assert!(text.contains("u100231"));
        assert!(text.ends_with("(2 rows)\n"));
    }

    #[test]
    fn test_render_schema_shows_sql_types() {
        let mut out = Vec::new();
        TerminalOutput::new().render_schema(&table(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("tbl_order\n"));
        assert!(text.contains("INTEGER"));
        assert!(text.contains("VARCHAR"));
    }
}
