//! Column model for data store descriptors

use serde::{Deserialize, Serialize};

/// Column (schema attribute) owned by a relational table, data file or port schema
///
/// # Example
///
/// ```rust
/// use data_engine_fvt::models::Column;
///
/// let column = Column::new("customers.csv::id", "id")
///     .with_description("customer identifier")
///     .with_data_type("INT");
/// assert_eq!(column.display_name, "id");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    /// Globally unique qualified name
    pub qualified_name: String,
    /// Display name
    pub display_name: String,
    /// Column description/documentation
    #[serde(default)]
    pub description: String,
    /// Position within the parent (0-based)
    #[serde(default)]
    pub position: i64,
    /// Data type (e.g., "INT", "VARCHAR(100)")
    #[serde(default)]
    pub data_type: String,
}

impl Column {
    pub fn new(qualified_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            display_name: display_name.into(),
            description: String::new(),
            position: 0,
            data_type: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = normalize_data_type(&data_type.into());
        self
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }
}

/// Upper-case a data type while preserving the inner content of parameterised types
fn normalize_data_type(data_type: &str) -> String {
    match data_type.find(['(', '<']) {
        Some(idx) => format!("{}{}", data_type[..idx].to_uppercase(), &data_type[idx..]),
        None => data_type.to_uppercase(),
    }
}
