//! Test fixtures for schema reader integration tests
//!
//! These fixtures represent a small retail warehouse: a `regions` lookup, a
//! `customers` table referencing it and an `orders` table referencing
//! customers, plus SQLite's own bookkeeping table.

#![allow(dead_code)]

use cubesext_core::{Column, Table};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// DDL for the retail warehouse
pub const RETAIL_DDL: &str = r#"
CREATE TABLE regions (
    id INTEGER PRIMARY KEY,
    name VARCHAR(64) NOT NULL
);

CREATE TABLE customers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    region_id INTEGER REFERENCES regions(id),
    created_at DATETIME
);

CREATE TABLE orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    amount REAL,
    status TEXT,
    placed_at TIMESTAMP,
    key TEXT
);
"#;

/// A SQLite database file living in a temporary directory
pub struct SqliteFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl SqliteFixture {
    /// Create a database file and run the given DDL against it
    pub fn with_ddl(ddl: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("warehouse.sqlite3");
        let conn = Connection::open(&path).expect("create database");
        conn.execute_batch(ddl).expect("apply DDL");
        Self { _dir: dir, path }
    }

    /// The retail warehouse
    pub fn retail() -> Self {
        Self::with_ddl(RETAIL_DDL)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URL in `sqlite:////absolute/path` form
    pub fn url(&self) -> String {
        format!("sqlite:///{}", self.path.display())
    }
}

/// In-memory `customers` table as the SQLite reader would reflect it
pub fn customers_table() -> Table {
    Table::new(
        "customers",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("name", "TEXT"),
            Column::new("region_id", "INTEGER").references("regions", "id"),
            Column::new("created_at", "DATETIME"),
        ],
    )
}

pub fn regions_table() -> Table {
    Table::new(
        "regions",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("name", "VARCHAR(64)"),
        ],
    )
}

pub fn orders_table() -> Table {
    Table::new(
        "orders",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("customer_id", "INTEGER").references("customers", "id"),
            Column::new("amount", "REAL"),
            Column::new("status", "TEXT"),
            Column::new("placed_at", "TIMESTAMP"),
        ],
    )
}
