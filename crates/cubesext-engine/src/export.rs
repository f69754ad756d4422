//! Model exporter: translates an inference result into a Cubes 1.0 document

use crate::document::{
    AggregateDoc, AttributeDoc, CubeDoc, DimensionDoc, DimensionInfo, HierarchyDoc, JoinDoc,
    LevelDoc, MappingDoc, MeasureDoc, ModelDocument,
};
use crate::entity::{Attribute, AttributeType, Entity, EntityId, Fact};
use crate::inference::InferenceResult;
use crate::mapper::{MapperKind, Mapping, OlapMapper};
use cubesext_core::DependencyGraph;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Errors raised while exporting or writing a model
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Entity graph has a cycle through: {}", .0.join(", "))]
    Cyclic(Vec<String>),

    #[error("Entity {0} is missing from the registry")]
    MissingEntity(EntityId),

    #[error("Olap mapper {0} has no fact mapper")]
    MissingFactMapper(String),

    #[error("Failed to serialize model: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write model to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builds the model document for one inference result
pub struct CubesModelWriter<'a> {
    result: &'a InferenceResult,
}

impl<'a> CubesModelWriter<'a> {
    pub fn new(result: &'a InferenceResult) -> Self {
        Self { result }
    }

    /// Translate the entity graph, starting from the root olap mapper
    pub fn build(&self) -> Result<ModelDocument, ExportError> {
        let order = self.result.registry.dependency_graph().topological_order();
        if !order.is_complete() {
            let names = order
                .cyclic
                .iter()
                .filter_map(|id| self.result.registry.get(*id))
                .map(|e| e.name().to_string())
                .collect();
            return Err(ExportError::Cyclic(names));
        }

        let mut document = ModelDocument::default();

        for id in self.result.used_dimensions() {
            document.dimensions.push(self.dimension_doc(id)?);
        }

        let root = self.result.root_mapper();
        for olap in self.cube_order(&root) {
            document.cubes.push(self.cube_doc(olap)?);
        }

        tracing::debug!(
            cubes = document.cubes.len(),
            dimensions = document.dimensions.len(),
            "model document built"
        );
        Ok(document)
    }

    fn entity(&self, id: EntityId) -> Result<&'a Entity, ExportError> {
        self.result.registry.get(id).ok_or(ExportError::MissingEntity(id))
    }

    fn fact(&self, id: EntityId) -> Result<&'a Fact, ExportError> {
        self.entity(id)?.as_fact().ok_or(ExportError::MissingEntity(id))
    }

    /// Included mappers before the mappers including them, ties by root order
    fn cube_order(&self, root: &OlapMapper) -> Vec<&'a OlapMapper> {
        let by_key: HashMap<&str, &OlapMapper> = self
            .result
            .olap_mappers
            .iter()
            .map(|m| (m.key.as_str(), m))
            .collect();

        let mut dag: DependencyGraph<&str> = DependencyGraph::new();
        for key in &root.include {
            dag.add_node(key.as_str());
        }
        for key in &root.include {
            if let Some(olap) = by_key.get(key.as_str()) {
                for included in &olap.include {
                    dag.add_dependency(key.as_str(), included.as_str());
                }
            }
        }

        let order = dag.topological_order();
        order
            .ordered
            .into_iter()
            .chain(order.cyclic)
            .filter_map(|key| {
                self.result
                    .olap_mappers
                    .iter()
                    .find(|m| m.key == key)
            })
            .collect()
    }

    fn dimension_doc(&self, id: EntityId) -> Result<DimensionDoc, ExportError> {
        match self.entity(id)? {
            Entity::Dimension(dim) => Ok(DimensionDoc {
                name: dim.name.clone(),
                label: dim.label.clone(),
                role: dim.role.clone(),
                info: None,
                levels: dim
                    .attributes
                    .iter()
                    .map(|attr| LevelDoc {
                        name: attr.name.clone(),
                        label: attr.label.clone(),
                        key: None,
                        label_attribute: None,
                        attributes: vec![attribute_doc(attr)],
                    })
                    .collect(),
                hierarchies: dim
                    .hierarchies
                    .iter()
                    .map(|h| HierarchyDoc {
                        name: h.name.clone(),
                        label: h.label.clone(),
                        levels: h.levels.clone(),
                    })
                    .collect(),
            }),

            Entity::FactDimension(dim) => {
                let fact = self.fact(dim.fact)?;
                Ok(DimensionDoc {
                    name: dim.name.clone(),
                    label: dim.label.clone(),
                    role: None,
                    info: None,
                    levels: vec![LevelDoc {
                        name: dim.name.clone(),
                        label: dim.label.clone(),
                        key: fact.primary_keys().next().map(|a| a.name.clone()),
                        label_attribute: fact
                            .attributes
                            .iter()
                            .find(|a| a.attribute_type == AttributeType::String)
                            .map(|a| a.name.clone()),
                        attributes: fact.attributes.iter().map(attribute_doc).collect(),
                    }],
                    hierarchies: Vec::new(),
                })
            }

            Entity::AliasDimension(alias) => {
                let target = self.dimension_doc(alias.target)?;
                Ok(DimensionDoc {
                    name: alias.name.clone(),
                    label: alias.label.clone(),
                    info: Some(DimensionInfo {
                        alias_of: Some(target.name.clone()),
                    }),
                    ..target
                })
            }

            Entity::Fact(_) => Err(ExportError::MissingEntity(id)),
        }
    }

    fn cube_doc(&self, olap: &OlapMapper) -> Result<CubeDoc, ExportError> {
        let fact_mapper = olap
            .fact_mapper()
            .ok_or_else(|| ExportError::MissingFactMapper(olap.key.clone()))?;
        let fact = self.fact(fact_mapper.entity)?;

        let mut dimensions = Vec::with_capacity(fact.dimensions.len());
        for id in &fact.dimensions {
            dimensions.push(self.entity(*id)?.name().to_string());
        }

        let measures: Vec<MeasureDoc> = fact
            .measures
            .iter()
            .map(|m| MeasureDoc {
                name: m.name.clone(),
                label: m.label.clone(),
                measure_type: m.kind,
            })
            .collect();

        let mut aggregates = Vec::with_capacity(measures.len() * 2 + 1);
        for measure in &fact.measures {
            for function in ["sum", "avg"] {
                aggregates.push(AggregateDoc {
                    name: format!("{}_{}", measure.name, function),
                    label: format!("{} {}", measure.label, function),
                    function: function.to_string(),
                    measure: Some(measure.name.clone()),
                });
            }
        }
        aggregates.push(AggregateDoc {
            name: "record_count".to_string(),
            label: "Record count".to_string(),
            function: "count".to_string(),
            measure: None,
        });

        let mut joins = Vec::new();
        let mut mappings = BTreeMap::new();

        for mapper in &olap.mappers {
            let entity_name = self.entity(mapper.entity)?.name();

            for mapping in &mapper.mappings {
                let source = format!("{}.{}", mapper.table, mapping.column());

                let (reference, doc) = match (&mapper.kind, mapping) {
                    (
                        MapperKind::AliasFactDimension {
                            target_table,
                            target_column,
                        },
                        Mapping::PrimaryKey { .. },
                    ) => {
                        joins.push(JoinDoc {
                            master: source,
                            detail: format!("{}.{}", target_table, target_column),
                            alias: entity_name.to_string(),
                        });
                        continue;
                    }
                    (MapperKind::Fact, _) => (mapping.name().to_string(), MappingDoc::Column(source)),
                    (_, Mapping::Extract { column, part, .. }) => (
                        attribute_ref(entity_name, mapping.name()),
                        MappingDoc::Extract {
                            table: mapper.table.clone(),
                            column: column.clone(),
                            extract: *part,
                        },
                    ),
                    (_, _) => (attribute_ref(entity_name, mapping.name()), MappingDoc::Column(source)),
                };

                if mappings.insert(reference.clone(), doc).is_some() {
                    tracing::warn!(cube = %fact.name, reference = %reference, "duplicate mapping replaced");
                }
            }
        }

        Ok(CubeDoc {
            name: fact.name.clone(),
            label: fact.label.clone(),
            fact: fact.table.clone(),
            key: fact_mapper.mappings.first().map(|m| m.name().to_string()),
            dimensions,
            measures,
            aggregates,
            joins,
            mappings,
        })
    }
}

fn attribute_doc(attr: &Attribute) -> AttributeDoc {
    AttributeDoc {
        name: attr.name.clone(),
        label: attr.label.clone(),
        attribute_type: Some(attr.attribute_type),
    }
}

/// Cubes attribute reference: the bare dimension name when the attribute is
/// named like its dimension
pub fn attribute_ref(dimension: &str, attribute: &str) -> String {
    if dimension == attribute {
        dimension.to_string()
    } else {
        format!("{}.{}", dimension, attribute)
    }
}

/// Write a document to `path`, or to a kept temporary file when none is given
pub fn write_model(document: &ModelDocument, path: Option<&Path>) -> Result<PathBuf, ExportError> {
    let json = document.to_json()?;

    match path {
        Some(path) => {
            std::fs::write(path, json).map_err(|source| ExportError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(path.to_path_buf())
        }
        None => {
            let temp_dir = std::env::temp_dir();
            let io_error = |source| ExportError::Io {
                path: temp_dir.clone(),
                source,
            };

            let mut file = tempfile::Builder::new()
                .prefix("cubesext-model-")
                .suffix(".json")
                .tempfile()
                .map_err(io_error)?;
            file.write_all(json.as_bytes()).map_err(io_error)?;

            let (_, path) = file.keep().map_err(|e| io_error(e.error))?;
            Ok(path)
        }
    }
}

/// Build the document for an inference result and write it out
pub fn export_model(
    result: &InferenceResult,
    path: Option<&Path>,
) -> Result<(ModelDocument, PathBuf), ExportError> {
    let document = CubesModelWriter::new(result).build()?;
    let path = write_model(&document, path)?;
    tracing::info!(path = %path.display(), "model written");
    Ok((document, path))
}
