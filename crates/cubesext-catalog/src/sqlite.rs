//! SQLite schema reader using the `pragma_table_info` and
//! `pragma_foreign_key_list` table-valued functions
//!
//! ## Usage
//!
//! ```rust,ignore
//! let reader = SqliteReader::open("warehouse.sqlite3")?;
//! let catalog = reader.read_catalog(&InferenceConfig::default())?;
//! ```

use crate::adapter::{ReadError, SchemaReader};
use cubesext_core::{Column, ForeignKeyRef, Nullability, Table};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// SQLite schema reader
pub struct SqliteReader {
    conn: Connection,

    /// Database file, `None` for in-memory databases
    path: Option<PathBuf>,
}

impl SqliteReader {
    /// Open an existing database file read-only
    ///
    /// A missing file is a connection error rather than a new empty database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            ReadError::Connection(format!(
                "Failed to open SQLite database {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (always empty)
    pub fn open_in_memory() -> Result<Self, ReadError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ReadError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        Ok(Self { conn, path: None })
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn, path: None }
    }

    /// Database file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn query_error(table: &str, e: rusqlite::Error) -> ReadError {
        ReadError::Schema(format!("Failed to reflect table {}: {}", table, e))
    }

    /// Primary key columns of a table, in key order
    fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, ReadError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")
            .map_err(|e| Self::query_error(table, e))?;

        let rows = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .map_err(|e| Self::query_error(table, e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| Self::query_error(table, e))
    }

    /// Foreign keys as (local column, target) pairs, in declaration order
    fn foreign_keys(&self, table: &str) -> Result<Vec<(String, ForeignKeyRef)>, ReadError> {
        let mut stmt = self
            .conn
            .prepare(r#"SELECT "from", "table", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#)
            .map_err(|e| Self::query_error(table, e))?;

        let rows = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(|e| Self::query_error(table, e))?;

        let mut keys = Vec::new();
        for row in rows {
            let (from, target, to) = row.map_err(|e| Self::query_error(table, e))?;

            // `REFERENCES target` without a column points at the target's primary key
            let to = match to {
                Some(column) => column,
                None => self
                    .primary_key_columns(&target)?
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "rowid".to_string()),
            };

            keys.push((from, ForeignKeyRef::new(target, to)));
        }

        Ok(keys)
    }
}

impl SchemaReader for SqliteReader {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn list_tables(&self) -> Result<Vec<String>, ReadError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .map_err(|e| ReadError::Schema(format!("Failed to list tables: {}", e)))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| ReadError::Schema(format!("Failed to list tables: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| ReadError::Schema(format!("Failed to list tables: {}", e)))
    }

    fn read_table(&self, table: &str) -> Result<Table, ReadError> {
        let mut stmt = self
            .conn
            .prepare(r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?1) ORDER BY cid"#)
            .map_err(|e| Self::query_error(table, e))?;

        let rows = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| Self::query_error(table, e))?;

        let mut columns = Vec::new();
        for row in rows {
            let (name, declared_type, not_null, pk) = row.map_err(|e| Self::query_error(table, e))?;

            let mut column = Column::new(name, declared_type).with_nullability(if not_null != 0 {
                Nullability::No
            } else {
                Nullability::Yes
            });
            if pk > 0 {
                column = column.primary_key();
            }
            columns.push(column);
        }

        if columns.is_empty() {
            return Err(ReadError::TableNotFound(table.to_string()));
        }

        for (from, target) in self.foreign_keys(table)? {
            if let Some(column) = columns.iter_mut().find(|c| c.name == from) {
                column.foreign_keys.push(target);
            }
        }

        Ok(Table::new(table, columns))
    }

    fn test_connection(&self) -> Result<(), ReadError> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| ReadError::Connection(format!("Connection test failed: {}", e)))
    }
}
