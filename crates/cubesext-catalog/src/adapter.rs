//! Schema reader trait shared by every relational source

use cubesext_core::{Catalog, DependencyGraph, InferenceConfig, Table};

/// Errors that can occur when reflecting a schema
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReadError {
    /// The source cannot be reached or the URL is not understood
    #[error("Connection error: {0}")]
    Connection(String),

    /// Reflection failed or produced nothing usable
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// Trait for sources that can enumerate their tables and columns
pub trait SchemaReader {
    /// Get the reader name (e.g., "SQLite", "PostgreSQL")
    fn name(&self) -> &'static str;

    /// List the names of all tables visible through the connection
    fn list_tables(&self) -> Result<Vec<String>, ReadError>;

    /// Reflect one table: ordered columns with type, nullability and keys
    fn read_table(&self, table: &str) -> Result<Table, ReadError>;

    /// Test the connection to the source
    fn test_connection(&self) -> Result<(), ReadError>;

    /// Reflect every usable table, in dependency order
    ///
    /// Reserved tables and tables outside the allow-list are skipped. Tables
    /// come after the tables their foreign keys reference; ties are broken by
    /// name.
    fn read_catalog(&self, options: &InferenceConfig) -> Result<Catalog, ReadError> {
        let mut names = self.list_tables()?;
        names.sort();

        let mut tables = Vec::new();
        for name in names {
            if options.is_reserved_table(&name) {
                tracing::debug!(table = %name, "skipping reserved table");
                continue;
            }
            if !options.is_table_allowed(&name) {
                tracing::debug!(table = %name, "table not in allow-list");
                continue;
            }
            tables.push(self.read_table(&name)?);
        }

        if tables.is_empty() {
            return Err(ReadError::Schema(format!(
                "No tables found through {} reader",
                self.name()
            )));
        }

        Ok(Catalog::from_tables(order_tables(tables)))
    }
}

/// Order tables so referenced tables come before the tables referencing
/// them. Tables on a foreign-key cycle keep their relative order and go last.
pub fn order_tables(tables: Vec<Table>) -> Vec<Table> {
    let mut dag: DependencyGraph<String> = DependencyGraph::new();
    for table in &tables {
        dag.add_node(table.name.clone());
    }
    for table in &tables {
        for referenced in table.referenced_tables() {
            // References to tables outside the set do not constrain the order
            if tables.iter().any(|t| t.name == referenced) {
                dag.add_dependency(table.name.clone(), referenced.to_string());
            }
        }
    }

    let order = dag.topological_order();
    if !order.is_complete() {
        tracing::warn!(
            tables = ?order.cyclic,
            "foreign keys form a cycle; these tables are appended unordered"
        );
    }

    let mut remaining = tables;
    let mut ordered = Vec::with_capacity(remaining.len());
    for name in order.ordered.iter().chain(order.cyclic.iter()) {
        if let Some(pos) = remaining.iter().position(|t| &t.name == name) {
            ordered.push(remaining.swap_remove(pos));
        }
    }
    ordered
}
