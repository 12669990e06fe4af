//! Instance properties carried by entities and relationships

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::types::TypeDef;

/// A single primitive or array property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Bool(bool),
    Array(Vec<String>),
}

impl PropertyValue {
    /// Render the value as a string, the way the harness compares it
    pub fn value_as_string(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Int(i) => i.to_string(),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Array(values) => values.join(","),
        }
    }

    /// Borrow the value if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value_as_string())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Named property values of an instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceProperties {
    #[serde(default)]
    properties: BTreeMap<String, PropertyValue>,
}

impl InstanceProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(name.to_string(), value.into());
    }

    /// Insert a string property, skipping empty values
    pub fn set_non_empty(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.set(name, value);
        }
    }

    pub fn property_value(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Convenience accessor for `property_value(name).value_as_string()`
    pub fn string_value(&self, name: &str) -> Option<String> {
        self.property_value(name).map(PropertyValue::value_as_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay `other` onto these properties
    pub fn merge(&mut self, other: InstanceProperties) {
        self.properties.extend(other.properties);
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Type of a stored instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceType {
    pub type_def_guid: String,
    pub type_def_name: String,
}

impl InstanceType {
    pub fn is(&self, type_def: &TypeDef) -> bool {
        self.type_def_guid == type_def.guid
    }
}

impl From<TypeDef> for InstanceType {
    fn from(def: TypeDef) -> Self {
        Self {
            type_def_guid: def.guid.to_string(),
            type_def_name: def.name.to_string(),
        }
    }
}
