//! Open a schema reader from a database URL
//!
//! Accepted forms:
//! - `sqlite:///relative/path.db` and `sqlite:////absolute/path.db`
//! - `sqlite://` (empty in-memory database)
//! - `postgres://...` and `postgresql://...` (requires the `postgres` feature)
//!
//! A `+driver` suffix on the scheme (`sqlite+pysqlite://`) is ignored.

use crate::adapter::{ReadError, SchemaReader};
use crate::postgres::PostgresReader;
use crate::sqlite::SqliteReader;
use url::Url;

/// Database backends a URL can point at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// SQLite file, `None` for in-memory
    Sqlite(Option<String>),

    /// PostgreSQL connection URL and schema to reflect
    Postgres { url: String, schema: String },
}

impl DatabaseUrl {
    /// Parse a database URL
    pub fn parse(url: &str) -> Result<Self, ReadError> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| ReadError::Connection(format!("Not a database URL: {}", url)))?;

        let backend = scheme
            .split('+')
            .next()
            .unwrap_or(scheme)
            .to_ascii_lowercase();

        match backend.as_str() {
            "sqlite" => {
                // sqlite:///x -> "x", sqlite:////abs -> "/abs"
                let path = rest.strip_prefix('/').unwrap_or(rest);
                if path.is_empty() || path == ":memory:" {
                    Ok(DatabaseUrl::Sqlite(None))
                } else {
                    Ok(DatabaseUrl::Sqlite(Some(path.to_string())))
                }
            }
            "postgres" | "postgresql" => {
                let parsed = Url::parse(&format!("postgresql://{}", rest))
                    .map_err(|e| ReadError::Connection(format!("Invalid PostgreSQL URL: {}", e)))?;

                let schema = parsed
                    .query_pairs()
                    .find(|(key, _)| key == "schema")
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_else(|| "public".to_string());

                // tokio-postgres rejects unknown query parameters
                let mut cleaned = parsed.clone();
                let kept: Vec<(String, String)> = parsed
                    .query_pairs()
                    .filter(|(key, _)| key != "schema")
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                if kept.is_empty() {
                    cleaned.set_query(None);
                } else {
                    cleaned.query_pairs_mut().clear().extend_pairs(kept);
                }

                Ok(DatabaseUrl::Postgres {
                    url: cleaned.to_string(),
                    schema,
                })
            }
            other => Err(ReadError::Connection(format!(
                "Unsupported database scheme '{}'",
                other
            ))),
        }
    }
}

/// Open a schema reader for a database URL
pub fn connect(url: &str) -> Result<Box<dyn SchemaReader>, ReadError> {
    match DatabaseUrl::parse(url)? {
        DatabaseUrl::Sqlite(Some(path)) => {
            tracing::debug!(path = %path, "opening SQLite database");
            Ok(Box::new(SqliteReader::open(path)?))
        }
        DatabaseUrl::Sqlite(None) => Ok(Box::new(SqliteReader::open_in_memory()?)),
        DatabaseUrl::Postgres { url, schema } => {
            tracing::debug!(schema = %schema, "connecting to PostgreSQL");
            Ok(Box::new(PostgresReader::connect(&url, schema)?))
        }
    }
}
