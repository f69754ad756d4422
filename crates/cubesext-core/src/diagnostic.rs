//! Diagnostic codes and non-fatal inference findings
//!
//! IMPORTANT: Diagnostic codes are stable.
//! NEVER rename or remove codes - reports written by older versions use them.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// Table skipped because its name carries a reserved prefix
    TableReserved,

    /// Column type cannot be mapped; the column was dropped
    ColumnUnmapped,

    /// Column excluded by name
    ColumnExcluded,

    /// Self-referencing foreign key skipped
    ForeignKeySelfReference,

    /// Foreign key target is not a fact; a lookup dimension was used instead
    ForeignKeyTargetNotFact,

    /// Forced dimension column has a type that cannot back a dimension attribute
    ForcedDimensionUnmappable,

    /// Table has no usable primary key; a synthetic row index is used
    SyntheticPrimaryKey,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableReserved => "TABLE_RESERVED",
            Self::ColumnUnmapped => "COLUMN_UNMAPPED",
            Self::ColumnExcluded => "COLUMN_EXCLUDED",
            Self::ForeignKeySelfReference => "FOREIGN_KEY_SELF_REFERENCE",
            Self::ForeignKeyTargetNotFact => "FOREIGN_KEY_TARGET_NOT_FACT",
            Self::ForcedDimensionUnmappable => "FORCED_DIMENSION_UNMAPPABLE",
            Self::SyntheticPrimaryKey => "SYNTHETIC_PRIMARY_KEY",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - something was dropped or approximated
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// Where in the source schema a diagnostic applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Table name
    pub table: String,

    /// Optional column name
    pub column: Option<String>,
}

impl Location {
    /// Location of a whole table
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: None,
        }
    }

    /// Location of a single column
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: Some(column.into()),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{}", self.table, column),
            None => write!(f, "{}", self.table),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location
    pub location: Option<Location>,

    /// Declared type involved, if any
    pub declared_type: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            declared_type: None,
        }
    }

    /// Shorthand for a warning
    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the declared type
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        assert_eq!(DiagnosticCode::ColumnUnmapped.as_str(), "COLUMN_UNMAPPED");
        assert_eq!(DiagnosticCode::ForeignKeySelfReference.as_str(), "FOREIGN_KEY_SELF_REFERENCE");
    }

    #[test]
    fn codes_serialize_as_their_identifiers() {
        let codes = [
            DiagnosticCode::TableReserved,
            DiagnosticCode::ColumnUnmapped,
            DiagnosticCode::ColumnExcluded,
            DiagnosticCode::ForeignKeySelfReference,
            DiagnosticCode::ForeignKeyTargetNotFact,
            DiagnosticCode::ForcedDimensionUnmappable,
            DiagnosticCode::SyntheticPrimaryKey,
        ];
        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }

        assert!(serde_json::from_str::<DiagnosticCode>("\"INFO\"").is_err());
        assert!(serde_json::from_str::<DiagnosticCode>("\"WARNING\"").is_err());
    }

    #[test]
    fn only_info_and_warn_severities() {
        assert_eq!(serde_json::from_str::<Severity>("\"info\"").unwrap(), Severity::Info);
        assert_eq!(serde_json::from_str::<Severity>("\"warn\"").unwrap(), Severity::Warn);
        assert!(serde_json::from_str::<Severity>("\"error\"").is_err());
        assert!(Severity::Info < Severity::Warn);
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::warn(DiagnosticCode::ColumnUnmapped, "Cannot map column 'payload'")
            .with_location(Location::column("events", "payload"))
            .with_declared_type("BLOB");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("COLUMN_UNMAPPED"));
        assert!(json.contains("\"warn\""));
        assert!(json.contains("BLOB"));
    }

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::warn(DiagnosticCode::ForeignKeySelfReference, "skipped")
            .with_location(Location::column("employees", "manager_id"));

        assert_eq!(
            diag.to_string(),
            "[FOREIGN_KEY_SELF_REFERENCE] skipped (employees.manager_id)"
        );
    }
}
