//! Relationship instances linking two entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{EntityDetail, EntityProxy};
use super::properties::{InstanceProperties, InstanceType};
use super::types::TypeDef;

/// A typed link between two entities
///
/// Relationships are stored once but can be queried from either end; each end
/// is carried as an [`EntityProxy`] holding the entity's qualified name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Server-assigned identifier
    pub guid: String,
    #[serde(rename = "type")]
    pub instance_type: InstanceType,
    pub entity_one_proxy: EntityProxy,
    pub entity_two_proxy: EntityProxy,
    #[serde(default)]
    pub properties: InstanceProperties,
    pub created_by: String,
    pub create_time: DateTime<Utc>,
}

impl Relationship {
    pub fn new(type_def: TypeDef, one: &EntityDetail, two: &EntityDetail, user_id: &str) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            instance_type: type_def.into(),
            entity_one_proxy: one.to_proxy(),
            entity_two_proxy: two.to_proxy(),
            properties: InstanceProperties::new(),
            created_by: user_id.to_string(),
            create_time: Utc::now(),
        }
    }

    /// Whether this relationship touches the given entity
    pub fn involves(&self, entity_guid: &str) -> bool {
        self.entity_one_proxy.guid == entity_guid || self.entity_two_proxy.guid == entity_guid
    }

    /// The end opposite to `entity_guid`, if the relationship touches it
    pub fn other_end(&self, entity_guid: &str) -> Option<&EntityProxy> {
        if self.entity_one_proxy.guid == entity_guid {
            Some(&self.entity_two_proxy)
        } else if self.entity_two_proxy.guid == entity_guid {
            Some(&self.entity_one_proxy)
        } else {
            None
        }
    }

    /// Whether the relationship connects the same pair of entities, in either order
    pub fn connects(&self, one_guid: &str, two_guid: &str) -> bool {
        (self.entity_one_proxy.guid == one_guid && self.entity_two_proxy.guid == two_guid)
            || (self.entity_one_proxy.guid == two_guid && self.entity_two_proxy.guid == one_guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types;

    fn column(qualified_name: &str) -> EntityDetail {
        EntityDetail::new(
            types::TABULAR_COLUMN,
            InstanceProperties::new().with(types::QUALIFIED_NAME, qualified_name),
            "tester",
        )
    }

    #[test]
    fn other_end_is_resolved_from_either_side() {
        let a = column("colA");
        let b = column("colB");
        let rel = Relationship::new(types::LINEAGE_MAPPING, &a, &b, "tester");

        assert_eq!(
            rel.other_end(&a.guid).and_then(EntityProxy::qualified_name),
            Some("colB".to_string())
        );
        assert_eq!(
            rel.other_end(&b.guid).and_then(EntityProxy::qualified_name),
            Some("colA".to_string())
        );
        assert!(rel.other_end("unrelated").is_none());
        assert!(rel.connects(&b.guid, &a.guid));
    }
}
