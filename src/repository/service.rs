//! Repository query helper used by the verification harness

use std::sync::Arc;
use tracing::debug;

use super::{RepositoryQuery, RepositoryResult};
use crate::models::types;
use crate::models::{EntityDetail, Relationship};

/// Thin wrapper over a repository query handle
///
/// Lookups by qualified name are exact: the value is regex-escaped before it
/// is passed as search criteria.
pub struct RepositoryService<Q: RepositoryQuery + ?Sized> {
    repository: Arc<Q>,
}

impl<Q: RepositoryQuery + ?Sized> Clone for RepositoryService<Q> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<Q: RepositoryQuery + ?Sized> RepositoryService<Q> {
    pub fn new(repository: Arc<Q>) -> Self {
        Self { repository }
    }

    /// Entities of the given type carrying exactly this property value
    pub async fn find_entity_by_property_value(
        &self,
        entity_type_guid: &str,
        value: &str,
    ) -> RepositoryResult<Vec<EntityDetail>> {
        let found = self
            .repository
            .find_entities_by_property_value(entity_type_guid, &regex::escape(value))
            .await?;
        debug!(
            "Found {} entities of type {} for value {}",
            found.len(),
            entity_type_guid,
            value
        );
        Ok(found)
    }

    pub async fn find_entity_guid_by_qualified_name(
        &self,
        qualified_name: &str,
    ) -> RepositoryResult<String> {
        self.repository
            .find_entity_guid_by_qualified_name(qualified_name)
            .await
    }

    pub async fn find_relationships_by_guid(
        &self,
        entity_guid: &str,
    ) -> RepositoryResult<Vec<Relationship>> {
        self.repository.find_relationships_by_guid(entity_guid).await
    }

    pub async fn get_related_entities(
        &self,
        entity_guid: &str,
        entity_type_guid: &str,
    ) -> RepositoryResult<Vec<EntityDetail>> {
        self.repository
            .get_related_entities(entity_guid, entity_type_guid)
            .await
    }

    /// Qualified names at the far end of the lineage mappings of an attribute
    ///
    /// Relationships of other types are ignored. The end whose qualified name
    /// equals `qualified_name` is the attribute itself; the other end is kept.
    pub fn lineage_mappings_proxies_qualified_names(
        &self,
        relationships: &[Relationship],
        qualified_name: &str,
    ) -> Vec<String> {
        lineage_mappings_proxies_qualified_names(relationships, qualified_name)
    }
}

pub fn lineage_mappings_proxies_qualified_names(
    relationships: &[Relationship],
    qualified_name: &str,
) -> Vec<String> {
    relationships
        .iter()
        .filter(|r| r.instance_type.is(&types::LINEAGE_MAPPING))
        .filter_map(|r| {
            let one = r.entity_one_proxy.qualified_name();
            let two = r.entity_two_proxy.qualified_name();
            if one.as_deref() == Some(qualified_name) {
                two
            } else if two.as_deref() == Some(qualified_name) {
                one
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstanceProperties;
    use crate::repository::{InMemoryRepository, MetadataStore};

    fn column(qualified_name: &str) -> EntityDetail {
        EntityDetail::new(
            types::TABULAR_COLUMN,
            InstanceProperties::new().with(types::QUALIFIED_NAME, qualified_name),
            "tester",
        )
    }

    #[test]
    fn test_lineage_proxies_ignore_structural_relationships() {
        let a = column("colA");
        let b = column("colB");
        let c = column("colC");
        let schema = EntityDetail::new(
            types::TABULAR_SCHEMA_TYPE,
            InstanceProperties::new().with(types::QUALIFIED_NAME, "file::schema"),
            "tester",
        );
        let relationships = vec![
            Relationship::new(types::LINEAGE_MAPPING, &a, &b, "tester"),
            Relationship::new(types::LINEAGE_MAPPING, &b, &c, "tester"),
            Relationship::new(types::ATTRIBUTE_FOR_SCHEMA, &schema, &b, "tester"),
        ];

        let mut names = lineage_mappings_proxies_qualified_names(&relationships, "colB");
        names.sort();
        assert_eq!(names, vec!["colA".to_string(), "colC".to_string()]);
    }

    #[tokio::test]
    async fn test_exact_lookup_escapes_regex() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.add_entity(EntityDetail::new(
            types::DATA_FILE,
            InstanceProperties::new().with(types::QUALIFIED_NAME, "(file)=a.csv"),
            "tester",
        ))
        .await
        .unwrap();
        let service = RepositoryService::new(repo);

        let found = service
            .find_entity_by_property_value(types::DATA_FILE.guid, "(file)=a.csv")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        let none = service
            .find_entity_by_property_value(types::DATA_FILE.guid, "(file)=a")
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
