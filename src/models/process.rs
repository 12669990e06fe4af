//! Job process descriptors carrying lineage mappings

use serde::{Deserialize, Serialize};
use std::fmt;

use super::column::Column;

/// Direction of a process port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    InPort,
    OutPort,
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::InPort => write!(f, "INPUT_PORT"),
            PortType::OutPort => write!(f, "OUTPUT_PORT"),
        }
    }
}

/// Schema attached to a port, listing the attributes flowing through it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortSchemaType {
    pub qualified_name: String,
    pub display_name: String,
    #[serde(default)]
    pub attributes: Vec<Column>,
}

/// Port implementation owned by a process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortImplementation {
    pub qualified_name: String,
    pub display_name: String,
    pub port_type: PortType,
    pub schema_type: PortSchemaType,
}

/// Data flow from one attribute to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LineageMapping {
    pub source_attribute: String,
    pub target_attribute: String,
}

impl LineageMapping {
    pub fn new(source_attribute: impl Into<String>, target_attribute: impl Into<String>) -> Self {
        Self {
            source_attribute: source_attribute.into(),
            target_attribute: target_attribute.into(),
        }
    }
}

/// Job process descriptor
///
/// A process owns ports whose schema attributes are connected to data store
/// columns by lineage mappings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Process {
    pub qualified_name: String,
    pub display_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub port_implementations: Vec<PortImplementation>,
    #[serde(default)]
    pub lineage_mappings: Vec<LineageMapping>,
}

/// Build the lineage mappings connecting each adjacent pair of a chain
pub fn chain_mappings(chain: &[String]) -> Vec<LineageMapping> {
    chain
        .windows(2)
        .map(|pair| LineageMapping::new(pair[0].clone(), pair[1].clone()))
        .collect()
}
