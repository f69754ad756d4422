//! OLAP entities produced by inference
//!
//! Entities live in the [`ComponentRegistry`](crate::registry::ComponentRegistry)
//! arena and refer to each other through [`EntityId`] handles.

use cubesext_core::ColumnType;
use serde::{Deserialize, Serialize};

/// Handle of an entity inside the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    /// Position of the entity in registration order
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Semantic type of a dimension or fact attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Integer,
    Float,
    String,
}

impl AttributeType {
    /// Attribute type able to hold values of a column, if any
    ///
    /// Booleans are carried as strings.
    pub fn from_column(column_type: ColumnType) -> Option<Self> {
        match column_type {
            ColumnType::Integer => Some(Self::Integer),
            ColumnType::Float => Some(Self::Float),
            ColumnType::String | ColumnType::Boolean => Some(Self::String),
            ColumnType::Datetime | ColumnType::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric kind of a measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    Integer,
    Float,
}

impl MeasureKind {
    pub fn from_column(column_type: ColumnType) -> Option<Self> {
        match column_type {
            ColumnType::Integer => Some(Self::Integer),
            ColumnType::Float => Some(Self::Float),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }
}

/// A named, typed attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub label: String,
    pub attribute_type: AttributeType,

    /// Part of the owning entity's key
    pub pk: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            attribute_type,
            pk: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn key(mut self) -> Self {
        self.pk = true;
        self
    }
}

/// Numeric, aggregable attribute of a fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub label: String,
    pub kind: MeasureKind,
}

/// Drill path through a dimension's attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub name: String,
    pub label: String,

    /// Attribute names, coarsest first
    pub levels: Vec<String>,
}

impl Hierarchy {
    pub fn new(name: impl Into<String>, levels: &[&str]) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            levels: levels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// One source table's rows seen as analyzable events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub key: String,
    pub name: String,
    pub label: String,

    /// Source table the fact reads from
    pub table: String,

    /// Dimensions, in column order
    pub dimensions: Vec<EntityId>,
    pub measures: Vec<Measure>,

    /// Raw attributes: key columns and embedded string columns
    pub attributes: Vec<Attribute>,
}

impl Fact {
    /// Key attributes, in column order
    pub fn primary_keys(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.pk)
    }
}

/// Categorical axis with its own attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub key: String,
    pub name: String,
    pub label: String,

    /// Semantic role, e.g. `time`
    pub role: Option<String>,

    pub attributes: Vec<Attribute>,
    pub hierarchies: Vec<Hierarchy>,
}

/// Dimension whose rows are another fact's rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactDimension {
    pub key: String,
    pub name: String,
    pub label: String,
    pub fact: EntityId,
}

/// Renamed reference to a dimension or fact dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDimension {
    pub key: String,
    pub name: String,
    pub label: String,
    pub target: EntityId,
}

/// Entity kinds, used for reporting and typed lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Fact,
    Dimension,
    FactDimension,
    AliasDimension,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fact => "fact",
            Self::Dimension => "dimension",
            Self::FactDimension => "fact dimension",
            Self::AliasDimension => "alias dimension",
        };
        f.write_str(s)
    }
}

/// Any entity stored in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Fact(Fact),
    Dimension(Dimension),
    FactDimension(FactDimension),
    AliasDimension(AliasDimension),
}

impl Entity {
    /// Unique registry key
    pub fn key(&self) -> &str {
        match self {
            Self::Fact(e) => &e.key,
            Self::Dimension(e) => &e.key,
            Self::FactDimension(e) => &e.key,
            Self::AliasDimension(e) => &e.key,
        }
    }

    /// Model-level name
    pub fn name(&self) -> &str {
        match self {
            Self::Fact(e) => &e.name,
            Self::Dimension(e) => &e.name,
            Self::FactDimension(e) => &e.name,
            Self::AliasDimension(e) => &e.name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Fact(e) => &e.label,
            Self::Dimension(e) => &e.label,
            Self::FactDimension(e) => &e.label,
            Self::AliasDimension(e) => &e.label,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Fact(_) => EntityKind::Fact,
            Self::Dimension(_) => EntityKind::Dimension,
            Self::FactDimension(_) => EntityKind::FactDimension,
            Self::AliasDimension(_) => EntityKind::AliasDimension,
        }
    }

    pub fn is_dimension(&self) -> bool {
        !matches!(self, Self::Fact(_))
    }

    /// Entities this one refers to
    pub fn dependencies(&self) -> Vec<EntityId> {
        match self {
            Self::Fact(fact) => fact.dimensions.clone(),
            Self::Dimension(_) => Vec::new(),
            Self::FactDimension(dim) => vec![dim.fact],
            Self::AliasDimension(alias) => vec![alias.target],
        }
    }

    pub fn as_fact(&self) -> Option<&Fact> {
        match self {
            Self::Fact(fact) => Some(fact),
            _ => None,
        }
    }
}
