//! Relational schema readers
//!
//! This crate reflects tables, columns, primary keys and foreign keys from a
//! database into a [`cubesext_core::Catalog`] ordered by table dependency.
//!
//! ## Features
//!
//! - SQLite is always available
//! - `postgres` - PostgreSQL support
//!
//! ## Example
//!
//! ```rust,ignore
//! use cubesext_catalog::{connect, SchemaReader};
//!
//! let reader = connect("sqlite:///warehouse.sqlite3")?;
//! let catalog = reader.read_catalog(&InferenceConfig::default())?;
//! ```

pub mod adapter;
pub mod connect;
pub mod mock;
pub mod postgres;
pub mod sqlite;

pub use adapter::{order_tables, ReadError, SchemaReader};
pub use connect::{connect, DatabaseUrl};
pub use mock::{MockReader, MockReaderBuilder};
pub use postgres::PostgresReader;
pub use sqlite::SqliteReader;
