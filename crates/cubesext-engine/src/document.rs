//! Cubes 1.0 model document
//!
//! These types mirror the JSON model the slicer server loads. They are both
//! written by the exporter and parsed back in tests and tooling.

use crate::entity::{AttributeType, MeasureKind};
use crate::mapper::DatePart;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Complete model: shared dimensions plus one cube per fact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub dimensions: Vec<DimensionDoc>,

    #[serde(default)]
    pub cubes: Vec<CubeDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDoc {
    pub name: String,
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<DimensionInfo>,

    pub levels: Vec<LevelDoc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hierarchies: Vec<HierarchyDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInfo {
    /// Name of the dimension an alias copies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDoc {
    pub name: String,
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_attribute: Option<String>,

    pub attributes: Vec<AttributeDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDoc {
    pub name: String,
    pub label: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyDoc {
    pub name: String,
    pub label: String,
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeDoc {
    pub name: String,
    pub label: String,

    /// Fact table
    pub fact: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default)]
    pub dimensions: Vec<String>,

    #[serde(default)]
    pub measures: Vec<MeasureDoc>,

    #[serde(default)]
    pub aggregates: Vec<AggregateDoc>,

    #[serde(default)]
    pub joins: Vec<JoinDoc>,

    #[serde(default)]
    pub mappings: BTreeMap<String, MappingDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureDoc {
    pub name: String,
    pub label: String,

    #[serde(rename = "type")]
    pub measure_type: MeasureKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDoc {
    pub name: String,
    pub label: String,
    pub function: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinDoc {
    /// `table.column` on the fact side
    pub master: String,

    /// `table.column` on the joined side
    pub detail: String,

    pub alias: String,
}

/// Physical location of a logical attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingDoc {
    /// `table.column`
    Column(String),

    /// Date part extracted from a column
    Extract {
        table: String,
        column: String,
        extract: DatePart,
    },
}

/// Counts used to compare a document with the inference that produced it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub cubes: usize,
    pub dimensions: usize,
    pub measures: usize,

    /// Mapping entries plus joins
    pub mappings: usize,
}

impl ModelDocument {
    /// Parse a document from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a document from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn cube(&self, name: &str) -> Option<&CubeDoc> {
        self.cubes.iter().find(|c| c.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionDoc> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            cubes: self.cubes.len(),
            dimensions: self.dimensions.len(),
            measures: self.cubes.iter().map(|c| c.measures.len()).sum(),
            mappings: self
                .cubes
                .iter()
                .map(|c| c.mappings.len() + c.joins.len())
                .sum(),
        }
    }
}
