//! Schema-to-model inference
//!
//! Every table becomes a fact. Columns are classified one by one:
//!
//! | column                         | result                                   |
//! |--------------------------------|------------------------------------------|
//! | primary key                    | key rule on the fact mapper              |
//! | single foreign key             | alias of the target's fact dimension     |
//! | string / boolean / forced      | embedded dimension                       |
//! | integer / float                | measure                                  |
//! | datetime                       | alias of the shared date dimension       |
//! | anything else                  | dropped, reported as a diagnostic        |
//!
//! Unsupported primary-key types and columns with several foreign keys abort
//! the whole pass.

use crate::entity::{
    AliasDimension, Attribute, AttributeType, Dimension, Entity, EntityId, EntityKind, Fact,
    FactDimension, Measure, MeasureKind,
};
use crate::mapper::{DatePart, EntityMapper, MapperKind, Mapping, OlapMapper};
use crate::registry::{ComponentRegistry, RegistryError, DATE_DIMENSION_KEY};
use cubesext_core::{
    slugify, strip_id_suffix, Catalog, Column, ColumnType, Diagnostic, DiagnosticCode, ForeignKeyRef,
    InferenceConfig, Location, ReportSummary, Severity, SlugSet, Table,
};
use std::collections::{HashMap, HashSet};

/// Fatal inference errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    #[error("Unsupported type '{declared_type}' for primary key column {table}.{column}")]
    UnsupportedType {
        table: String,
        column: String,
        declared_type: String,
    },

    #[error("Multiple foreign keys ({count}) found for column {table}.{column}")]
    MultipleForeignKeys {
        table: String,
        column: String,
        count: usize,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Walks a catalog and builds the entity graph
pub struct InferenceEngine {
    registry: ComponentRegistry,
    options: InferenceConfig,

    /// Shared date dimension, resolved once
    date_dimension: EntityId,

    /// Facts by raw table name
    facts: HashMap<String, EntityId>,

    /// Fact dimensions by referenced table name
    fact_dimensions: HashMap<String, EntityId>,

    /// Lookup dimensions for referenced tables without a fact
    lookup_dimensions: HashMap<String, EntityId>,

    /// Slugs by raw table name, unique across the pass
    table_slugs: HashMap<String, String>,
    table_names: SlugSet,

    /// Exported dimension names, unique across the pass
    dimension_names: SlugSet,

    /// Per-table olap mappers, in table order
    olap_mappers: Vec<OlapMapper>,
    olap_index: HashMap<String, usize>,

    diagnostics: Vec<Diagnostic>,
}

/// Scratch state for the table being walked
struct TableState {
    slug: String,
    column_names: SlugSet,
    olap: OlapMapper,
    fact_mappings: Vec<Mapping>,
    dimensions: Vec<EntityId>,
    measures: Vec<Measure>,
    attributes: Vec<Attribute>,
}

impl InferenceEngine {
    /// Create an engine over a registry holding the standard library
    pub fn new(registry: ComponentRegistry, options: InferenceConfig) -> Result<Self, InferenceError> {
        let date_dimension = registry.lookup_kind(DATE_DIMENSION_KEY, EntityKind::Dimension)?;

        let mut dimension_names = SlugSet::new();
        for (_, entity) in registry.iter().filter(|(_, e)| e.is_dimension()) {
            dimension_names.reserve(entity.name());
        }

        Ok(Self {
            registry,
            options,
            date_dimension,
            facts: HashMap::new(),
            fact_dimensions: HashMap::new(),
            lookup_dimensions: HashMap::new(),
            table_slugs: HashMap::new(),
            table_names: SlugSet::new(),
            dimension_names,
            olap_mappers: Vec::new(),
            olap_index: HashMap::new(),
            diagnostics: Vec::new(),
        })
    }

    /// Create an engine with a fresh standard registry
    pub fn with_options(options: InferenceConfig) -> Result<Self, InferenceError> {
        Self::new(ComponentRegistry::with_standard_library(), options)
    }

    /// Run the pass over every table, in catalog order
    pub fn infer(mut self, catalog: &Catalog) -> Result<InferenceResult, InferenceError> {
        let mut tables = 0;
        for table in &catalog.tables {
            if self.options.is_reserved_table(&table.name) {
                self.diagnose(
                    Diagnostic::new(
                        DiagnosticCode::TableReserved,
                        Severity::Info,
                        format!("Table '{}' is reserved and was skipped", table.name),
                    )
                    .with_location(Location::table(&table.name)),
                );
                continue;
            }

            self.infer_table(table)?;
            tables += 1;
        }

        tracing::info!(
            tables,
            entities = self.registry.len(),
            diagnostics = self.diagnostics.len(),
            "inference finished"
        );

        Ok(InferenceResult {
            registry: self.registry,
            olap_mappers: self.olap_mappers,
            diagnostics: self.diagnostics,
        })
    }

    fn infer_table(&mut self, table: &Table) -> Result<(), InferenceError> {
        tracing::debug!(table = %table.name, columns = table.columns.len(), "inferring table");

        let slug = self.table_slug(&table.name);
        let mut state = TableState {
            olap: OlapMapper::for_table(format!("cubesext.{}.olapmapper", slug), &table.name),
            slug,
            column_names: SlugSet::new(),
            fact_mappings: Vec::new(),
            dimensions: Vec::new(),
            measures: Vec::new(),
            attributes: Vec::new(),
        };

        for column in &table.columns {
            self.infer_column(table, column, &mut state)?;
        }

        if state.fact_mappings.is_empty() {
            self.diagnose(
                Diagnostic::new(
                    DiagnosticCode::SyntheticPrimaryKey,
                    Severity::Info,
                    format!(
                        "Table '{}' has no integer or string primary key; using synthetic '{}'",
                        table.name,
                        Mapping::SYNTHETIC_KEY
                    ),
                )
                .with_location(Location::table(&table.name)),
            );
            state.fact_mappings.push(Mapping::synthetic_key());
            state
                .attributes
                .insert(0, Attribute::new(Mapping::SYNTHETIC_KEY, AttributeType::Integer).key());
        }

        let fact = Fact {
            key: format!("cubesext.{}.fact", state.slug),
            name: state.slug.clone(),
            label: table.name.clone(),
            table: table.name.clone(),
            dimensions: state.dimensions,
            measures: state.measures,
            attributes: state.attributes,
        };
        let fact_id = self.registry.register(Entity::Fact(fact))?;

        // Fact mapper goes last so dimension mappers are handled first
        state.olap.mappers.push(
            EntityMapper::new(MapperKind::Fact, fact_id, &table.name).with_mappings(state.fact_mappings),
        );

        self.facts.insert(table.name.clone(), fact_id);
        self.olap_index.insert(table.name.clone(), self.olap_mappers.len());
        self.olap_mappers.push(state.olap);
        Ok(())
    }

    fn infer_column(
        &mut self,
        table: &Table,
        column: &Column,
        state: &mut TableState,
    ) -> Result<(), InferenceError> {
        if self.options.is_column_excluded(&column.name) {
            self.diagnose(
                Diagnostic::new(
                    DiagnosticCode::ColumnExcluded,
                    Severity::Info,
                    format!("Column '{}' is excluded by name", column.name),
                )
                .with_location(Location::column(&table.name, &column.name)),
            );
            return Ok(());
        }

        tracing::debug!(
            table = %table.name,
            column = %column.name,
            declared_type = %column.declared_type,
            nullable = ?column.nullable,
            pk = column.primary_key,
            fks = column.foreign_keys.len(),
            "column"
        );

        let column_slug = column_slug(&column.name, &mut state.column_names);

        if column.primary_key {
            let attribute_type = match column.column_type {
                ColumnType::Integer => AttributeType::Integer,
                ColumnType::String => AttributeType::String,
                _ => {
                    return Err(InferenceError::UnsupportedType {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        declared_type: column.declared_type.clone(),
                    })
                }
            };

            state.fact_mappings.push(Mapping::PrimaryKey {
                name: column_slug.clone(),
                column: column.name.clone(),
                attribute_type,
            });
            state
                .attributes
                .push(Attribute::new(column_slug, attribute_type).with_label(&column.name).key());
            return Ok(());
        }

        match column.foreign_keys.as_slice() {
            [] => {}
            [target] if target.table == table.name => {
                self.diagnose(
                    Diagnostic::warn(
                        DiagnosticCode::ForeignKeySelfReference,
                        format!("Column '{}' references its own table; skipped", column.name),
                    )
                    .with_location(Location::column(&table.name, &column.name)),
                );
                return Ok(());
            }
            [target] => {
                let alias = self.alias_foreign_key(table, column, &column_slug, target, state)?;
                state.dimensions.push(alias);
                return Ok(());
            }
            targets => {
                return Err(InferenceError::MultipleForeignKeys {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    count: targets.len(),
                })
            }
        }

        let forced = self.options.is_forced_dimension(&column.name);
        let attribute_type = AttributeType::from_column(column.column_type);

        if forced && attribute_type.is_none() {
            self.diagnose(
                Diagnostic::warn(
                    DiagnosticCode::ForcedDimensionUnmappable,
                    format!(
                        "Column '{}' cannot back a dimension attribute; classified by type instead",
                        column.name
                    ),
                )
                .with_location(Location::column(&table.name, &column.name))
                .with_declared_type(&column.declared_type),
            );
        }

        if let Some(attribute_type) =
            attribute_type.filter(|ty| forced || *ty == AttributeType::String)
        {
            let dimension = self.embedded_dimension(table, column, &column_slug, attribute_type, state)?;
            state.dimensions.push(dimension);
            state
                .attributes
                .push(Attribute::new(&column_slug, attribute_type).with_label(&column.name));
            return Ok(());
        }

        if let Some(kind) = MeasureKind::from_column(column.column_type) {
            state.measures.push(Measure {
                name: column.name.clone(),
                label: column.name.clone(),
                kind,
            });
            return Ok(());
        }

        if column.column_type == ColumnType::Datetime {
            let alias = self.date_alias(table, column, &column_slug, state)?;
            state.dimensions.push(alias);
            return Ok(());
        }

        self.diagnose(
            Diagnostic::warn(
                DiagnosticCode::ColumnUnmapped,
                format!(
                    "Cannot map column '{}' (type: {})",
                    column.name, column.declared_type
                ),
            )
            .with_location(Location::column(&table.name, &column.name))
            .with_declared_type(&column.declared_type),
        );
        Ok(())
    }

    /// Dimension whose single key attribute lives in the fact table
    fn embedded_dimension(
        &mut self,
        table: &Table,
        column: &Column,
        column_slug: &str,
        attribute_type: AttributeType,
        state: &mut TableState,
    ) -> Result<EntityId, InferenceError> {
        let name = self
            .dimension_names
            .unique(&format!("{}_{}", state.slug, column_slug));

        let id = self.registry.register(Entity::Dimension(Dimension {
            key: format!("cubesext.{}.dim.col.{}", state.slug, column_slug),
            name: name.clone(),
            label: column.name.clone(),
            role: None,
            attributes: vec![Attribute::new(&name, attribute_type).with_label(&column.name).key()],
            hierarchies: Vec::new(),
        }))?;

        state.olap.mappers.push(
            EntityMapper::new(MapperKind::EmbeddedDimension, id, &table.name).with_mapping(
                Mapping::Column {
                    name,
                    column: column.name.clone(),
                },
            ),
        );
        Ok(id)
    }

    /// Alias of the shared date dimension with one extract rule per date part
    fn date_alias(
        &mut self,
        table: &Table,
        column: &Column,
        column_slug: &str,
        state: &mut TableState,
    ) -> Result<EntityId, InferenceError> {
        let stem = strip_id_suffix(column_slug);
        let id = self.registry.register(Entity::AliasDimension(AliasDimension {
            key: format!("cubesext.{}.dim.datetime.{}", state.slug, column_slug),
            name: self.dimension_names.unique(&format!("{}_{}", state.slug, stem)),
            label: format!("{} {}", state.slug, stem),
            target: self.date_dimension,
        }))?;

        let extracts = DatePart::ALL.iter().map(|part| Mapping::Extract {
            name: part.as_str().to_string(),
            column: column.name.clone(),
            part: *part,
        });
        state.olap.mappers.push(
            EntityMapper::new(MapperKind::EmbeddedDimension, id, &table.name).with_mappings(extracts),
        );
        Ok(id)
    }

    /// Alias naming the relationship a foreign key expresses
    fn alias_foreign_key(
        &mut self,
        table: &Table,
        column: &Column,
        column_slug: &str,
        target: &ForeignKeyRef,
        state: &mut TableState,
    ) -> Result<EntityId, InferenceError> {
        let target_slug = self.table_slug(&target.table);
        let key_type = AttributeType::from_column(column.column_type)
            .filter(|ty| *ty != AttributeType::Float)
            .unwrap_or(AttributeType::Integer);

        let dimension = match self.facts.get(&target.table).copied() {
            Some(fact) => self.fact_dimension(&state.slug, &target.table, &target_slug, fact)?,
            None => {
                self.diagnose(
                    Diagnostic::warn(
                        DiagnosticCode::ForeignKeyTargetNotFact,
                        format!(
                            "Column '{}' references '{}', which has no fact; using a lookup dimension",
                            column.name, target.table
                        ),
                    )
                    .with_location(Location::column(&table.name, &column.name)),
                );
                self.lookup_dimension(&state.slug, target, &target_slug, key_type)?
            }
        };

        let stem = strip_id_suffix(column_slug);
        let name = self
            .dimension_names
            .unique(&format!("{}_{}_{}", state.slug, target_slug, stem));

        let id = self.registry.register(Entity::AliasDimension(AliasDimension {
            key: format!("cubesext.{}.dim.fk.{}.{}", state.slug, target_slug, column_slug),
            name: name.clone(),
            label: format!("{} {} {}", state.slug, target_slug, stem),
            target: dimension,
        }))?;

        state.olap.mappers.push(
            EntityMapper::new(
                MapperKind::AliasFactDimension {
                    target_table: target.table.clone(),
                    target_column: target.column.clone(),
                },
                id,
                &table.name,
            )
            .with_mapping(Mapping::PrimaryKey {
                name,
                column: column.name.clone(),
                attribute_type: key_type,
            }),
        );

        if let Some(&idx) = self.olap_index.get(&target.table) {
            let included = self.olap_mappers[idx].key.clone();
            state.olap.include(&included);
        }
        Ok(id)
    }

    /// Fact dimension over a fact table, created once per referenced table
    fn fact_dimension(
        &mut self,
        table_slug: &str,
        target_table: &str,
        target_slug: &str,
        fact: EntityId,
    ) -> Result<EntityId, InferenceError> {
        if let Some(&id) = self.fact_dimensions.get(target_table) {
            return Ok(id);
        }

        let id = self.registry.register(Entity::FactDimension(FactDimension {
            key: format!("cubesext.{}.dim.fact.{}", table_slug, target_slug),
            name: self.dimension_names.unique(target_slug),
            label: target_table.to_string(),
            fact,
        }))?;
        self.fact_dimensions.insert(target_table.to_string(), id);
        Ok(id)
    }

    /// Plain dimension keyed on the referenced column, for targets without a fact
    fn lookup_dimension(
        &mut self,
        table_slug: &str,
        target: &ForeignKeyRef,
        target_slug: &str,
        key_type: AttributeType,
    ) -> Result<EntityId, InferenceError> {
        if let Some(&id) = self.lookup_dimensions.get(&target.table) {
            return Ok(id);
        }

        let key_name = Some(slugify(&target.column))
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| "key".to_string());

        let id = self.registry.register(Entity::Dimension(Dimension {
            key: format!("cubesext.{}.dim.lookup.{}", table_slug, target_slug),
            name: self.dimension_names.unique(target_slug),
            label: target.table.clone(),
            role: None,
            attributes: vec![Attribute::new(key_name, key_type)
                .with_label(&target.column)
                .key()],
            hierarchies: Vec::new(),
        }))?;
        self.lookup_dimensions.insert(target.table.clone(), id);
        Ok(id)
    }

    /// Slug for a raw table name, allocated on first sight
    fn table_slug(&mut self, table: &str) -> String {
        if let Some(slug) = self.table_slugs.get(table) {
            return slug.clone();
        }

        let mut base = slugify(table);
        if base.is_empty() {
            base = format!("t{}", self.table_slugs.len() + 1);
        }
        let slug = self.table_names.unique(&base);
        self.table_slugs.insert(table.to_string(), slug.clone());
        slug
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::debug!(code = %diagnostic.code, "{}", diagnostic.message),
            Severity::Warn => {
                tracing::warn!(code = %diagnostic.code, "{}", diagnostic.message)
            }
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Slug for a column, unique within its table
fn column_slug(column: &str, taken: &mut SlugSet) -> String {
    let mut base = slugify(column);
    if base.is_empty() {
        base = format!("c{}", taken.len() + 1);
    }
    taken.unique(&base)
}

/// Entity graph produced by one inference pass
#[derive(Debug, Clone)]
pub struct InferenceResult {
    pub registry: ComponentRegistry,

    /// Per-table olap mappers, in table order
    pub olap_mappers: Vec<OlapMapper>,

    /// Non-fatal findings
    pub diagnostics: Vec<Diagnostic>,
}

impl InferenceResult {
    /// Root mapper including every table's mapper
    pub fn root_mapper(&self) -> OlapMapper {
        OlapMapper::root(&self.olap_mappers)
    }

    /// Facts in registration order
    pub fn facts(&self) -> impl Iterator<Item = (EntityId, &Fact)> {
        self.registry
            .iter()
            .filter_map(|(id, entity)| entity.as_fact().map(|fact| (id, fact)))
    }

    /// Fact inferred for a source table
    pub fn fact_for_table(&self, table: &str) -> Option<&Fact> {
        self.facts().map(|(_, fact)| fact).find(|fact| fact.table == table)
    }

    pub fn olap_mapper(&self, table: &str) -> Option<&OlapMapper> {
        self.olap_mappers
            .iter()
            .find(|m| m.table.as_deref() == Some(table))
    }

    /// Dimensions reachable from some fact, in dependency order
    ///
    /// Standard-library dimensions nothing refers to are left out.
    pub fn used_dimensions(&self) -> Vec<EntityId> {
        let dag = self.registry.dependency_graph();

        let mut used = HashSet::new();
        for (id, _) in self.facts() {
            used.extend(dag.upstream(&id));
        }

        let order = dag.topological_order();
        order
            .ordered
            .into_iter()
            .chain(order.cyclic)
            .filter(|id| {
                used.contains(id)
                    && self
                        .registry
                        .get(*id)
                        .map(Entity::is_dimension)
                        .unwrap_or(false)
            })
            .collect()
    }

    pub fn fact_count(&self) -> usize {
        self.facts().count()
    }

    pub fn measure_count(&self) -> usize {
        self.facts().map(|(_, fact)| fact.measures.len()).sum()
    }

    /// Mapping rules across all table mappers
    pub fn mapping_rule_count(&self) -> usize {
        self.olap_mappers.iter().map(OlapMapper::mapping_count).sum()
    }

    /// Summary counts for the inference report
    pub fn summary(&self, tables: usize) -> ReportSummary {
        let mut summary = ReportSummary {
            tables,
            facts: self.fact_count(),
            dimensions: self.used_dimensions().len(),
            measures: self.measure_count(),
            mapping_rules: self.mapping_rule_count(),
            ..ReportSummary::default()
        };
        for diagnostic in &self.diagnostics {
            match diagnostic.severity {
                Severity::Info => summary.info += 1,
                Severity::Warn => summary.warnings += 1,
            }
            if diagnostic.code == DiagnosticCode::ColumnUnmapped {
                summary.dropped_columns += 1;
            }
        }
        summary
    }
}
