//! Column mapping rules binding entity attributes to source columns

use crate::entity::{AttributeType, EntityId};
use serde::{Deserialize, Serialize};

/// Part of a date extracted by a mapping rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePart {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl DatePart {
    /// Every part, in the order the date dimension declares them
    pub const ALL: [DatePart; 5] = [
        DatePart::Year,
        DatePart::Quarter,
        DatePart::Month,
        DatePart::Week,
        DatePart::Day,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
        }
    }
}

impl std::fmt::Display for DatePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single mapping rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Key attribute read from a column
    PrimaryKey {
        name: String,
        column: String,
        attribute_type: AttributeType,
    },

    /// Plain attribute read from a column
    Column { name: String, column: String },

    /// Date part extracted from a datetime column
    Extract {
        name: String,
        column: String,
        part: DatePart,
    },
}

impl Mapping {
    /// Synthetic row-index key for tables without a usable primary key
    pub const SYNTHETIC_KEY: &'static str = "index";

    pub fn synthetic_key() -> Self {
        Mapping::PrimaryKey {
            name: Self::SYNTHETIC_KEY.to_string(),
            column: Self::SYNTHETIC_KEY.to_string(),
            attribute_type: AttributeType::Integer,
        }
    }

    /// Logical attribute name
    pub fn name(&self) -> &str {
        match self {
            Mapping::PrimaryKey { name, .. }
            | Mapping::Column { name, .. }
            | Mapping::Extract { name, .. } => name,
        }
    }

    /// Physical source column
    pub fn column(&self) -> &str {
        match self {
            Mapping::PrimaryKey { column, .. }
            | Mapping::Column { column, .. }
            | Mapping::Extract { column, .. } => column,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self, Mapping::PrimaryKey { .. })
    }
}

/// What an entity mapper maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapperKind {
    /// The fact's own rows
    Fact,

    /// Dimension whose values live in the fact table itself
    EmbeddedDimension,

    /// Alias joined through a foreign key to the rows of another table
    AliasFactDimension {
        target_table: String,
        target_column: String,
    },
}

/// Mapping rules for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapper {
    pub kind: MapperKind,
    pub entity: EntityId,

    /// Table the mapped columns belong to
    pub table: String,

    pub mappings: Vec<Mapping>,
}

impl EntityMapper {
    pub fn new(kind: MapperKind, entity: EntityId, table: impl Into<String>) -> Self {
        Self {
            kind,
            entity,
            table: table.into(),
            mappings: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn with_mappings(mut self, mappings: impl IntoIterator<Item = Mapping>) -> Self {
        self.mappings.extend(mappings);
        self
    }
}

/// Aggregation of entity mappers plus included sub-mappers
///
/// One is built per table; a root instance including every table's mapper
/// drives the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OlapMapper {
    pub key: String,

    /// Source table, `None` for the root mapper
    pub table: Option<String>,

    /// Entity mappers; the fact mapper comes last
    pub mappers: Vec<EntityMapper>,

    /// Keys of included olap mappers, in inclusion order
    pub include: Vec<String>,
}

impl OlapMapper {
    /// Key of the root mapper
    pub const ROOT_KEY: &'static str = "cubesext.olapmapper";

    pub fn for_table(key: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            table: Some(table.into()),
            mappers: Vec::new(),
            include: Vec::new(),
        }
    }

    /// Root mapper including the given mappers in order
    pub fn root<'a>(children: impl IntoIterator<Item = &'a OlapMapper>) -> Self {
        Self {
            key: Self::ROOT_KEY.to_string(),
            table: None,
            mappers: Vec::new(),
            include: children.into_iter().map(|m| m.key.clone()).collect(),
        }
    }

    /// Include another mapper once
    pub fn include(&mut self, key: &str) {
        if !self.include.iter().any(|k| k == key) {
            self.include.push(key.to_string());
        }
    }

    /// The fact's own mapper
    pub fn fact_mapper(&self) -> Option<&EntityMapper> {
        self.mappers.iter().find(|m| m.kind == MapperKind::Fact)
    }

    /// Number of mapping rules across all entity mappers
    pub fn mapping_count(&self) -> usize {
        self.mappers.iter().map(|m| m.mappings.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_parts_in_declaration_order() {
        let names: Vec<&str> = DatePart::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["year", "quarter", "month", "week", "day"]);
    }

    #[test]
    fn synthetic_key_is_integer_index() {
        let key = Mapping::synthetic_key();
        assert!(key.is_primary_key());
        assert_eq!(key.name(), "index");
        assert_eq!(key.column(), "index");
    }

    #[test]
    fn include_is_idempotent() {
        let mut mapper = OlapMapper::for_table("cubesext.orders.olapmapper", "orders");
        mapper.include("cubesext.customers.olapmapper");
        mapper.include("cubesext.customers.olapmapper");
        assert_eq!(mapper.include.len(), 1);
    }

    #[test]
    fn root_includes_children_in_order() {
        let a = OlapMapper::for_table("a", "a");
        let b = OlapMapper::for_table("b", "b");
        let root = OlapMapper::root([&a, &b]);
        assert_eq!(root.include, vec!["a", "b"]);
        assert_eq!(root.table, None);
    }
}
