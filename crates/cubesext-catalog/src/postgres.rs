//! PostgreSQL schema reader using information_schema
//!
//! Works with PostgreSQL 9.4+ and compatible databases. The reader is
//! synchronous: it drives `tokio-postgres` on a private current-thread
//! runtime, so callers never see an async boundary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let reader = PostgresReader::connect(
//!     "host=localhost port=5432 dbname=shop user=postgres password=secret",
//!     "public",
//! )?;
//! let catalog = reader.read_catalog(&InferenceConfig::default())?;
//! ```
//!
//! Reference: https://www.postgresql.org/docs/current/information-schema.html

use crate::adapter::{ReadError, SchemaReader};
use cubesext_core::Table;

#[cfg(feature = "postgres")]
use cubesext_core::{Column, ForeignKeyRef, Nullability};

#[cfg(feature = "postgres")]
use tokio_postgres::{Client, NoTls};

/// PostgreSQL schema reader
pub struct PostgresReader {
    /// PostgreSQL client (only available with postgres feature)
    #[cfg(feature = "postgres")]
    client: Client,

    /// Runtime driving the client and its connection task
    #[cfg(feature = "postgres")]
    runtime: tokio::runtime::Runtime,

    /// Schema (namespace) whose tables are reflected
    schema: String,
}

impl PostgresReader {
    /// Connect with a libpq-style connection string or a `postgresql://` URL
    #[cfg(feature = "postgres")]
    pub fn connect(conn_str: &str, schema: impl Into<String>) -> Result<Self, ReadError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ReadError::Connection(format!("Failed to start runtime: {}", e)))?;

        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(conn_str, NoTls))
            .map_err(|e| ReadError::Connection(format!("Failed to connect to PostgreSQL: {}", e)))?;

        // Connection handler runs whenever the runtime is driven by block_on
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self {
            client,
            runtime,
            schema: schema.into(),
        })
    }

    /// Create reader without postgres feature (returns error)
    #[cfg(not(feature = "postgres"))]
    pub fn connect(_conn_str: &str, _schema: impl Into<String>) -> Result<Self, ReadError> {
        Err(ReadError::Connection(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }

    /// Schema being reflected
    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[cfg(feature = "postgres")]
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, ReadError> {
        self.runtime
            .block_on(self.client.query(sql, params))
            .map_err(|e| {
                let err_str = e.to_string();
                if err_str.contains("permission denied") {
                    ReadError::Connection(err_str)
                } else {
                    ReadError::Schema(err_str)
                }
            })
    }
}

#[cfg(feature = "postgres")]
impl SchemaReader for PostgresReader {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn list_tables(&self) -> Result<Vec<String>, ReadError> {
        let rows = self.query(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
            &[&self.schema],
        )?;

        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    fn read_table(&self, table: &str) -> Result<Table, ReadError> {
        let rows = self.query(
            r#"
            SELECT column_name, data_type, is_nullable
            FROM information_schema.columns
            WHERE table_schema = $1
              AND table_name = $2
            ORDER BY ordinal_position
            "#,
            &[&self.schema, &table],
        )?;

        let mut columns: Vec<Column> = rows
            .iter()
            .map(|row| {
                let name: String = row.get(0);
                let data_type: String = row.get(1);
                let is_nullable: String = row.get(2);

                let nullable = match is_nullable.to_uppercase().as_str() {
                    "YES" => Nullability::Yes,
                    "NO" => Nullability::No,
                    _ => Nullability::Unknown,
                };
                Column::new(name, data_type).with_nullability(nullable)
            })
            .collect();

        if columns.is_empty() {
            return Err(ReadError::TableNotFound(format!("{}.{}", self.schema, table)));
        }

        let primary_keys = self.query(
            r#"
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY kcu.ordinal_position
            "#,
            &[&self.schema, &table],
        )?;

        for row in &primary_keys {
            let name: String = row.get(0);
            if let Some(column) = columns.iter_mut().find(|c| c.name == name) {
                column.primary_key = true;
            }
        }

        let foreign_keys = self.query(
            r#"
            SELECT kcu.column_name, ccu.table_name, ccu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
              ON tc.constraint_name = ccu.constraint_name
             AND tc.table_schema = ccu.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY tc.constraint_name, kcu.ordinal_position
            "#,
            &[&self.schema, &table],
        )?;

        for row in &foreign_keys {
            let name: String = row.get(0);
            let target = ForeignKeyRef::new(row.get::<_, String>(1), row.get::<_, String>(2));
            if let Some(column) = columns.iter_mut().find(|c| c.name == name) {
                column.foreign_keys.push(target);
            }
        }

        Ok(Table::new(table, columns))
    }

    fn test_connection(&self) -> Result<(), ReadError> {
        self.query("SELECT 1", &[])
            .map(|_| ())
            .map_err(|e| ReadError::Connection(format!("Connection test failed: {}", e)))
    }
}

#[cfg(not(feature = "postgres"))]
impl SchemaReader for PostgresReader {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn list_tables(&self) -> Result<Vec<String>, ReadError> {
        Err(ReadError::Connection(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }

    fn read_table(&self, _table: &str) -> Result<Table, ReadError> {
        Err(ReadError::Connection(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }

    fn test_connection(&self) -> Result<(), ReadError> {
        Err(ReadError::Connection(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }
}
