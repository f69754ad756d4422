//! Catalog fixtures for inference tests

#![allow(dead_code)]

use cubesext_core::{Catalog, Column, Table};

/// `customers(id, name)`
pub fn customers() -> Table {
    Table::new(
        "customers",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("name", "TEXT"),
        ],
    )
}

/// `orders(id, customer_id -> customers.id, amount, created_at)`
pub fn orders() -> Table {
    Table::new(
        "orders",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("customer_id", "INTEGER").references("customers", "id"),
            Column::new("amount", "FLOAT"),
            Column::new("created_at", "DATETIME"),
        ],
    )
}

/// `shipments` referencing customers twice, plus `orders`
pub fn shipments() -> Table {
    Table::new(
        "shipments",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("order_id", "INTEGER").references("orders", "id"),
            Column::new("sender_id", "INTEGER").references("customers", "id"),
            Column::new("receiver_id", "INTEGER").references("customers", "id"),
            Column::new("weight", "REAL"),
        ],
    )
}

/// `employees` with a self-referencing manager column
pub fn employees() -> Table {
    Table::new(
        "employees",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("manager_id", "INTEGER").references("employees", "id"),
            Column::new("name", "VARCHAR(80)"),
        ],
    )
}

/// Customers and orders, in dependency order
pub fn retail() -> Catalog {
    Catalog::from_tables(vec![customers(), orders()])
}

/// Retail plus shipments
pub fn logistics() -> Catalog {
    Catalog::from_tables(vec![customers(), orders(), shipments()])
}

pub const RETAIL_DDL: &str = r#"
CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);
CREATE TABLE orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER REFERENCES customers(id),
    amount FLOAT,
    created_at DATETIME,
    key TEXT
);
"#;
