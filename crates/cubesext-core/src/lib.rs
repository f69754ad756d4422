//! Cubesext Core
//!
//! Shared domain model: reflected relational schemas, normalized column types,
//! slug identifiers, configuration and diagnostics.
//! Never rename diagnostic codes - they end up in inference reports.

pub mod config;
pub mod dag;
pub mod diagnostic;
pub mod report;
pub mod schema;
pub mod slug;

pub use config::{Config, ConfigError, InferenceConfig, SlicerSettings, ViewerSettings};
pub use dag::{DependencyGraph, TopologicalOrder};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use report::{Report, ReportSummary, ReportVersion};
pub use schema::{Catalog, Column, ColumnType, ForeignKeyRef, Nullability, Table};
pub use slug::{slugify, strip_id_suffix, SlugSet};
