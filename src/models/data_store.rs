//! Data store descriptors: databases, relational tables and data files

use serde::{Deserialize, Serialize};

use super::column::Column;

/// Database descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub qualified_name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Stored as the `deployedImplementationType` property
    #[serde(default)]
    pub database_type: String,
    #[serde(default)]
    pub database_version: String,
    #[serde(default)]
    pub database_instance: String,
    #[serde(default)]
    pub database_imported_from: String,
}

/// Relational table descriptor with its ordered columns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationalTable {
    pub qualified_name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

/// Data file descriptor (CSV and similar tabular files)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataFile {
    pub qualified_name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl RelationalTable {
    pub fn first_column(&self) -> Option<&Column> {
        self.columns.first()
    }
}

impl DataFile {
    pub fn first_column(&self) -> Option<&Column> {
        self.columns.first()
    }
}
