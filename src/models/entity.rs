//! Entity instances stored in a metadata repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::properties::{InstanceProperties, InstanceType};
use super::types::{QUALIFIED_NAME, TypeDef};

/// A typed metadata record with named properties
///
/// Entities are created by the data engine and only read by the harness.
///
/// # Example
///
/// ```rust
/// use data_engine_fvt::models::{EntityDetail, InstanceProperties, types};
///
/// let entity = EntityDetail::new(
///     types::DATABASE,
///     InstanceProperties::new().with("qualifiedName", "db1-qn"),
///     "garygeeke",
/// );
/// assert_eq!(entity.qualified_name().as_deref(), Some("db1-qn"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDetail {
    /// Server-assigned identifier
    pub guid: String,
    #[serde(rename = "type")]
    pub instance_type: InstanceType,
    #[serde(default)]
    pub properties: InstanceProperties,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Incremented on every property update
    pub version: u64,
}

impl EntityDetail {
    pub fn new(type_def: TypeDef, properties: InstanceProperties, user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            guid: Uuid::new_v4().to_string(),
            instance_type: type_def.into(),
            properties,
            created_by: user_id.to_string(),
            updated_by: None,
            create_time: now,
            update_time: now,
            version: 1,
        }
    }

    pub fn qualified_name(&self) -> Option<String> {
        self.properties.string_value(QUALIFIED_NAME)
    }

    /// Apply a property update, bumping the version
    pub fn update(&mut self, properties: InstanceProperties, user_id: &str) {
        self.properties.merge(properties);
        self.updated_by = Some(user_id.to_string());
        self.update_time = Utc::now();
        self.version += 1;
    }

    /// Proxy view of this entity, as carried on relationship ends
    pub fn to_proxy(&self) -> EntityProxy {
        let mut unique_properties = InstanceProperties::new();
        if let Some(qualified_name) = self.qualified_name() {
            unique_properties.set(QUALIFIED_NAME, qualified_name);
        }
        EntityProxy {
            guid: self.guid.clone(),
            instance_type: self.instance_type.clone(),
            unique_properties,
        }
    }
}

/// Lightweight reference to an entity at one end of a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProxy {
    pub guid: String,
    #[serde(rename = "type")]
    pub instance_type: InstanceType,
    #[serde(default)]
    pub unique_properties: InstanceProperties,
}

impl EntityProxy {
    pub fn qualified_name(&self) -> Option<String> {
        self.unique_properties.string_value(QUALIFIED_NAME)
    }
}
