//! Component registry: the arena every entity of an inference pass lives in

use crate::entity::{Attribute, AttributeType, Dimension, Entity, EntityId, EntityKind, Hierarchy};
use crate::mapper::DatePart;
use cubesext_core::DependencyGraph;
use std::collections::HashMap;

/// Key of the shared date dimension in the standard library
pub const DATE_DIMENSION_KEY: &str = "cubesext.datetime.date";

/// Registry lookup and registration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Component already registered: {0}")]
    DuplicateKey(String),

    #[error("Component not found: {0}")]
    NotFound(String),

    #[error("Component {key} is a {actual}, expected a {expected}")]
    WrongKind {
        key: String,
        expected: EntityKind,
        actual: EntityKind,
    },
}

/// Arena of entities addressed by [`EntityId`], with key lookup
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entities: Vec<Entity>,
    by_key: HashMap<String, EntityId>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry preloaded with the standard dimensions
    pub fn with_standard_library() -> Self {
        let mut registry = Self::new();
        // Fresh registry, the key cannot clash
        let _ = registry.register(Entity::Dimension(date_dimension()));
        registry
    }

    /// Register an entity; keys must be unique
    pub fn register(&mut self, entity: Entity) -> Result<EntityId, RegistryError> {
        if self.by_key.contains_key(entity.key()) {
            return Err(RegistryError::DuplicateKey(entity.key().to_string()));
        }

        let id = EntityId(self.entities.len() as u32);
        tracing::trace!(key = %entity.key(), kind = %entity.kind(), %id, "registered component");
        self.by_key.insert(entity.key().to_string(), id);
        self.entities.push(entity);
        Ok(id)
    }

    /// Resolve a key to its handle
    pub fn lookup(&self, key: &str) -> Result<EntityId, RegistryError> {
        self.by_key
            .get(key)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Resolve a key and check the entity kind
    pub fn lookup_kind(&self, key: &str, expected: EntityKind) -> Result<EntityId, RegistryError> {
        let id = self.lookup(key)?;
        let actual = self.entities[id.index()].kind();
        if actual != expected {
            return Err(RegistryError::WrongKind {
                key: key.to_string(),
                expected,
                actual,
            });
        }
        Ok(id)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Entity behind a handle
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// All entities with their handles, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(idx, entity)| (EntityId(idx as u32), entity))
    }

    /// Entities of one kind, in registration order
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.iter().filter(move |(_, e)| e.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Reference graph between entities (an entity depends on what it refers to)
    pub fn dependency_graph(&self) -> DependencyGraph<EntityId> {
        let mut dag = DependencyGraph::new();
        for (id, _) in self.iter() {
            dag.add_node(id);
        }
        for (id, entity) in self.iter() {
            for dependency in entity.dependencies() {
                dag.add_dependency(id, dependency);
            }
        }
        dag
    }
}

/// Shared calendar dimension
fn date_dimension() -> Dimension {
    Dimension {
        key: DATE_DIMENSION_KEY.to_string(),
        name: "date".to_string(),
        label: "Date".to_string(),
        role: Some("time".to_string()),
        attributes: DatePart::ALL
            .iter()
            .map(|part| {
                let attribute = Attribute::new(part.as_str(), AttributeType::Integer);
                // Year is the coarsest level and identifies the dimension
                if *part == DatePart::Year {
                    attribute.key()
                } else {
                    attribute
                }
            })
            .collect(),
        hierarchies: vec![
            Hierarchy::new("ymd", &["year", "quarter", "month", "day"]),
            Hierarchy::new("yw", &["year", "week"]),
        ],
    }
}
