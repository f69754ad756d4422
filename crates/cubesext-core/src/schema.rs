//! Reflected relational schema types and the normalized column type system

use serde::{Deserialize, Serialize};

/// Normalized column type
///
/// Maps driver-specific declared types to the handful of categories the
/// inference engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Floating point or fixed-point numeric (FLOAT, REAL, DOUBLE, DECIMAL, NUMERIC)
    Float,

    /// Integer of any width (INTEGER, BIGINT, SMALLINT, ...)
    Integer,

    /// Character data (VARCHAR(n), CHAR, TEXT, CLOB, ...)
    String,

    /// BOOLEAN
    Boolean,

    /// DATETIME, TIMESTAMP or DATE
    Datetime,

    /// Anything the engine cannot map
    Unknown,
}

/// Type names (whole words) that denote integers
const INTEGER_NAMES: &[&str] = &[
    "INT",
    "INTEGER",
    "BIGINT",
    "SMALLINT",
    "TINYINT",
    "MEDIUMINT",
    "INT2",
    "INT4",
    "INT8",
    "SERIAL",
    "SMALLSERIAL",
    "BIGSERIAL",
    "SERIAL4",
    "SERIAL8",
];

impl ColumnType {
    /// Normalize a declared SQL type.
    ///
    /// Temporal and boolean names are recognised first. Integers match on
    /// whole words so `INTERVAL` or `POINT` never count as `INT`; character
    /// and floating point names match by substring, like SQLite affinity.
    /// Works for both SQLite declarations and PostgreSQL's
    /// `information_schema` spellings.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared
            .split('(')
            .next()
            .unwrap_or(declared)
            .trim()
            .to_uppercase();

        if upper.is_empty() {
            return Self::Unknown;
        }

        if upper.starts_with("DATETIME") || upper.starts_with("TIMESTAMP") || upper == "DATE" {
            return Self::Datetime;
        }

        if upper.starts_with("BOOL") {
            return Self::Boolean;
        }

        if upper
            .split_whitespace()
            .any(|word| INTEGER_NAMES.contains(&word))
        {
            return Self::Integer;
        }

        if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            return Self::String;
        }

        if upper.contains("REAL")
            || upper.contains("FLOA")
            || upper.contains("DOUB")
            || upper.starts_with("DECIMAL")
            || upper.starts_with("NUMERIC")
        {
            return Self::Float;
        }

        Self::Unknown
    }

    /// Numeric types can become measures
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Float | Self::Integer)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float => write!(f, "Float"),
            Self::Integer => write!(f, "Integer"),
            Self::String => write!(f, "String"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Datetime => write!(f, "Datetime"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Nullability state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nullability {
    /// Definitely nullable
    Yes,

    /// Definitely not nullable
    No,

    /// Cannot determine nullability
    Unknown,
}

/// Target of a foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table name
    pub table: String,

    /// Referenced column name
    pub column: String,
}

impl ForeignKeyRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// A reflected column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name as declared in the source
    pub name: String,

    /// Declared type, verbatim
    pub declared_type: String,

    /// Normalized type
    pub column_type: ColumnType,

    /// Nullability
    pub nullable: Nullability,

    /// Part of the table's primary key
    pub primary_key: bool,

    /// Foreign key targets (usually zero or one)
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl Column {
    /// Create a new column; the normalized type is derived from the declared one
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            column_type: ColumnType::from_declared(&declared_type),
            declared_type,
            nullable: Nullability::Unknown,
            primary_key: false,
            foreign_keys: Vec::new(),
        }
    }

    /// Set nullability
    pub fn with_nullability(mut self, nullable: Nullability) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark as primary key column
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = Nullability::No;
        self
    }

    /// Add a foreign key target
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_keys.push(ForeignKeyRef::new(table, column));
        self
    }
}

/// A reflected table with its ordered columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name as declared in the source
    pub name: String,

    /// Ordered list of columns
    pub columns: Vec<Column>,
}

impl Table {
    /// Create a table from columns
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of the other tables this table references through foreign keys
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut referenced: Vec<&str> = Vec::new();
        for fk in self.columns.iter().flat_map(|c| c.foreign_keys.iter()) {
            if fk.table != self.name && !referenced.contains(&fk.table.as_str()) {
                referenced.push(fk.table.as_str());
            }
        }
        referenced
    }
}

/// Ordered set of tables produced by a schema reader
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Tables in enumeration order
    pub tables: Vec<Table>,
}

impl Catalog {
    /// Create a catalog from tables, keeping their order
    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Find a table by name
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get table names in enumeration order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}
