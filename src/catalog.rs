//! Read-only metadata catalog loaded from a base directory

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::info;

use crate::config::{METADATA_DIR, METADATA_FILE};
use crate::error::{Error, Result};
use crate::model::{Database, TableMeta};

/// Immutable table and column metadata for one database.
///
/// Built once by [`Catalog::load`]; no method mutates it afterwards, so it can
/// be shared across threads behind an `Arc` without locking.
#[derive(Debug)]
pub struct Catalog {
    base_path: PathBuf,
    database: Database,
    tables: IndexMap<String, TableMeta>,
}

impl Catalog {
    /// Load the descriptor at `<base_path>/_metadata/meta.json`.
    pub fn load(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            return Err(Error::Config(format!(
                "base path {} is not a readable directory",
                base_path.display()
            )));
        }

        let meta_path = base_path.join(METADATA_DIR).join(METADATA_FILE);
        let contents = fs::read_to_string(&meta_path).map_err(|e| {
            Error::Config(format!(
                "cannot read meta file {}: {}",
                meta_path.display(),
                e
            ))
        })?;
        let database: Database = serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "failed to parse meta file {}: {}",
                meta_path.display(),
                e
            ))
        })?;

        Self::from_database(base_path, database)
    }

    /// Build a catalog from an already-parsed descriptor.
    pub fn from_database(base_path: impl Into<PathBuf>, database: Database) -> Result<Self> {
        let mut tables = IndexMap::with_capacity(database.tables.len());
        for table in &database.tables {
            if tables.insert(table.name.clone(), table.clone()).is_some() {
                return Err(Error::Config(format!(
                    "table '{}' is declared more than once",
                    table.name
                )));
            }
        }

        let base_path = base_path.into();
        info!(
            database = %database.name,
            tables = tables.len(),
            base_path = %base_path.display(),
            "loaded catalog"
        );

        Ok(Self {
            base_path,
            database,
            tables,
        })
    }

    /// Full metadata snapshot, tables in descriptor order
    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory holding the data files of a table
    pub fn table_dir(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Table names containing `pattern` (case-sensitive), sorted.
    /// `None` matches every table.
    pub fn list_table_names(&self, pattern: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .keys()
            .filter(|name| pattern.map_or(true, |p| name.contains(p)))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Same filter and order as [`Catalog::list_table_names`], full metadata.
    pub fn list_tables(&self, pattern: Option<&str>) -> Vec<TableMeta> {
        self.list_table_names(pattern)
            .iter()
            .filter_map(|name| self.tables.get(name).cloned())
            .collect()
    }

    /// Exact-name lookup
    pub fn get_table(&self, name: &str) -> Result<&TableMeta> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnType;
    use crate::test_util::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_table_names_sorted() {
        let dir = eshop_db();
        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(
            catalog.list_table_names(None),
            vec!["audit_order", "tbl_buyer", "tbl_order"]
        );
        // Descriptor order is kept in the snapshot
        assert_eq!(catalog.database().tables[0].name, "tbl_order");
    }

    #[test]
    fn test_pattern_is_case_sensitive_substring() {
        let dir = eshop_db();
        let catalog = Catalog::load(dir.path()).unwrap();
        let all = catalog.list_table_names(None);

        for pattern in ["order", "tbl_", "_", "buyer", "ORDER", "zzz", ""] {
            let matched = catalog.list_table_names(Some(pattern));
            assert!(matched.iter().all(|n| all.contains(n)));
            assert!(matched.iter().all(|n| n.contains(pattern)));
            let mut sorted = matched.clone();
            sorted.sort();
            assert_eq!(matched, sorted);
        }

        assert_eq!(
            catalog.list_table_names(Some("order")),
            vec!["audit_order", "tbl_order"]
        );
        assert!(catalog.list_table_names(Some("ORDER")).is_empty());
        // Regex metacharacters are literal text
        assert!(catalog.list_table_names(Some("tbl.order")).is_empty());
    }

    #[test]
    fn test_list_tables_matches_names() {
        let dir = eshop_db();
        let catalog = Catalog::load(dir.path()).unwrap();
        let tables = catalog.list_tables(Some("tbl"));
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["tbl_buyer", "tbl_order"]);
        assert_eq!(tables[1].columns[3].column_type, ColumnType::Boolean);
    }

    #[test]
    fn test_get_table() {
        let dir = eshop_db();
        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.get_table("tbl_order").unwrap().column_count(), 4);

        let err = catalog.get_table("missing_table").unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "table", .. }));
        // No fuzzy matching
        assert!(catalog.get_table("tbl_ord").is_err());
    }

    #[test]
    fn test_base_path_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let err = Catalog::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_descriptor() {
        let dir = TempDir::new().unwrap();
        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("meta.json")));
    }

    #[test]
    fn test_unparseable_descriptor() {
        let dir = TempDir::new().unwrap();
        write_file(&dir.path().join("_metadata/meta.json"), "{\"name\": ");
        assert!(matches!(
            Catalog::load(dir.path()).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_duplicate_table_names() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join("_metadata/meta.json"),
            r#"{"name":"d","tables":[{"name":"t","columns":[]},{"name":"t","columns":[]}]}"#,
        );
        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("more than once")));
    }
}
