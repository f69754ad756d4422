//! Cubesext engine - schema to OLAP model inference
//!
//! This crate implements:
//! - The entity arena and component registry
//! - Column mapping rules and olap mappers
//! - The inference pass over a reflected catalog
//! - Export to a Cubes 1.0 model document

pub mod document;
pub mod entity;
pub mod export;
pub mod inference;
pub mod mapper;
pub mod pipeline;
pub mod registry;

pub use document::{DocumentStats, ModelDocument};
pub use entity::{
    AliasDimension, Attribute, AttributeType, Dimension, Entity, EntityId, EntityKind, Fact,
    FactDimension, Hierarchy, Measure, MeasureKind,
};
pub use export::{export_model, write_model, CubesModelWriter, ExportError};
pub use inference::{InferenceEngine, InferenceError, InferenceResult};
pub use mapper::{DatePart, EntityMapper, MapperKind, Mapping, OlapMapper};
pub use pipeline::{build_model, sql_to_cubes, ModelBuild, PipelineError};
pub use registry::{ComponentRegistry, RegistryError, DATE_DIMENSION_KEY};
