//! Mock schema reader for testing
//!
//! This reader returns predefined tables without opening any database.
//! It's useful for:
//! - Unit testing inference logic
//! - Simulating reflection failures on specific tables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cubesext_catalog::{MockReader, SchemaReader};
//! use cubesext_core::{Column, Table};
//!
//! let reader = MockReader::builder()
//!     .with_table(Table::new("customers", vec![
//!         Column::new("id", "INTEGER").primary_key(),
//!         Column::new("name", "TEXT"),
//!     ]))
//!     .build();
//!
//! let catalog = reader.read_catalog(&InferenceConfig::default())?;
//! ```

use crate::adapter::{ReadError, SchemaReader};
use cubesext_core::Table;
use std::collections::BTreeMap;

/// Mock schema reader for testing
#[derive(Debug, Clone)]
pub struct MockReader {
    /// Predefined tables by name
    tables: BTreeMap<String, Table>,

    /// Errors to return for specific tables
    errors: BTreeMap<String, ReadError>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Name to return from name() method
    reader_name: &'static str,
}

impl MockReader {
    /// Create a new mock reader with no tables
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            errors: BTreeMap::new(),
            fail_connection: false,
            reader_name: "Mock",
        }
    }

    /// Start building a mock reader
    pub fn builder() -> MockReaderBuilder {
        MockReaderBuilder::new()
    }

    /// Create a reader exposing the given tables
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        let mut reader = Self::new();
        for table in tables {
            reader.add_table(table);
        }
        reader
    }

    /// Add (or replace) a table
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Configure an error to be returned when a specific table is read
    pub fn add_error_for_table(&mut self, table: impl Into<String>, error: ReadError) {
        self.errors.insert(table.into(), error);
    }

    /// Configure to fail all connection tests and table listings
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Set a custom reader name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.reader_name = name;
        self
    }

    /// Number of predefined tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    fn connection_failure(&self) -> ReadError {
        ReadError::Connection("Mock connection failure".to_string())
    }
}

impl Default for MockReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaReader for MockReader {
    fn name(&self) -> &'static str {
        self.reader_name
    }

    fn list_tables(&self) -> Result<Vec<String>, ReadError> {
        if self.fail_connection {
            return Err(self.connection_failure());
        }
        // Tables that only exist as an error still show up in the listing
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        for name in self.errors.keys() {
            if !self.tables.contains_key(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_table(&self, table: &str) -> Result<Table, ReadError> {
        if let Some(error) = self.errors.get(table) {
            return Err(error.clone());
        }

        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| ReadError::TableNotFound(table.to_string()))
    }

    fn test_connection(&self) -> Result<(), ReadError> {
        if self.fail_connection {
            Err(self.connection_failure())
        } else {
            Ok(())
        }
    }
}

/// Builder for MockReader with a fluent API
#[derive(Debug, Default)]
pub struct MockReaderBuilder {
    tables: Vec<Table>,
    errors: Vec<(String, ReadError)>,
    fail_connection: bool,
    reader_name: Option<&'static str>,
}

impl MockReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_error(mut self, table: impl Into<String>, error: ReadError) -> Self {
        self.errors.push((table.into(), error));
        self
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.reader_name = Some(name);
        self
    }

    pub fn build(self) -> MockReader {
        let mut reader = MockReader::from_tables(self.tables);
        for (table, error) in self.errors {
            reader.add_error_for_table(table, error);
        }
        reader.fail_connection = self.fail_connection;
        if let Some(name) = self.reader_name {
            reader.reader_name = name;
        }
        reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubesext_core::{Column, InferenceConfig};

    fn customers() -> Table {
        Table::new(
            "customers",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("name", "TEXT"),
            ],
        )
    }

    #[test]
    fn test_mock_reader_basic() {
        let reader = MockReader::from_tables(vec![customers()]);

        let table = reader.read_table("customers").unwrap();
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(reader.table_count(), 1);
    }

    #[test]
    fn test_mock_reader_table_not_found() {
        let reader = MockReader::new();
        assert!(matches!(
            reader.read_table("missing"),
            Err(ReadError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_mock_reader_connection_failure() {
        let reader = MockReader::new().with_connection_failure();
        assert!(reader.test_connection().is_err());
        assert!(reader.read_catalog(&InferenceConfig::default()).is_err());
    }

    #[test]
    fn test_mock_reader_custom_error() {
        let reader = MockReader::builder()
            .with_table(customers())
            .with_error("restricted", ReadError::Schema("permission denied".to_string()))
            .build();

        assert_eq!(reader.list_tables().unwrap(), vec!["customers", "restricted"]);
        let err = reader.read_catalog(&InferenceConfig::default()).unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_mock_reader_empty_catalog_is_error() {
        let reader = MockReader::new();
        assert!(matches!(
            reader.read_catalog(&InferenceConfig::default()),
            Err(ReadError::Schema(_))
        ));
    }

    #[test]
    fn test_mock_reader_name() {
        assert_eq!(MockReader::new().name(), "Mock");
        assert_eq!(MockReader::builder().with_name("Fixture").build().name(), "Fixture");
    }
}
