//! In-memory repository backend (`serverinmem`)

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

use super::{
    DEFAULT_MAX_PAGE_SIZE, MetadataStore, RepositoryError, RepositoryQuery, RepositoryResult,
    check_page, compile_search_criteria, ensure_entity_type, ensure_relationship_type,
    lock_poisoned, matches_search_criteria, sort_entities, sort_relationships,
};
use crate::models::types;
use crate::models::{EntityDetail, InstanceProperties, Relationship};

#[derive(Default)]
struct InMemoryState {
    entities: HashMap<String, EntityDetail>,
    relationships: HashMap<String, Relationship>,
    /// Entity GUID -> GUIDs of the relationships touching it
    relationships_by_entity: HashMap<String, Vec<String>>,
}

impl InMemoryState {
    fn relationships_of(&self, entity_guid: &str) -> impl Iterator<Item = &Relationship> {
        self.relationships_by_entity
            .get(entity_guid)
            .into_iter()
            .flatten()
            .filter_map(|guid| self.relationships.get(guid))
    }
}

/// Repository keeping entities and relationships in hash maps
pub struct InMemoryRepository {
    state: RwLock<InMemoryState>,
    max_page_size: usize,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::with_max_page_size(DEFAULT_MAX_PAGE_SIZE)
    }

    pub fn with_max_page_size(max_page_size: usize) -> Self {
        Self {
            state: RwLock::new(InMemoryState::default()),
            max_page_size,
        }
    }

    /// Number of stored entities
    pub fn entity_count(&self) -> RepositoryResult<usize> {
        Ok(self.state.read().map_err(lock_poisoned)?.entities.len())
    }

    /// Number of stored relationships
    pub fn relationship_count(&self) -> RepositoryResult<usize> {
        Ok(self.state.read().map_err(lock_poisoned)?.relationships.len())
    }
}

#[async_trait]
impl MetadataStore for InMemoryRepository {
    async fn add_entity(&self, entity: EntityDetail) -> RepositoryResult<EntityDetail> {
        ensure_entity_type(&entity.instance_type.type_def_guid)?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.entities.contains_key(&entity.guid) {
            return Err(RepositoryError::InvalidParameter(format!(
                "Entity {} already exists",
                entity.guid
            )));
        }
        debug!(
            "Adding {} entity {}",
            entity.instance_type.type_def_name, entity.guid
        );
        state.entities.insert(entity.guid.clone(), entity.clone());
        Ok(entity)
    }

    async fn update_entity_properties(
        &self,
        entity_guid: &str,
        properties: InstanceProperties,
        user_id: &str,
    ) -> RepositoryResult<EntityDetail> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let entity = state
            .entities
            .get_mut(entity_guid)
            .ok_or_else(|| RepositoryError::EntityNotKnown(entity_guid.to_string()))?;
        entity.update(properties, user_id);
        Ok(entity.clone())
    }

    async fn add_relationship(&self, relationship: Relationship) -> RepositoryResult<Relationship> {
        ensure_relationship_type(&relationship.instance_type.type_def_guid)?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        for end in [&relationship.entity_one_proxy, &relationship.entity_two_proxy] {
            if !state.entities.contains_key(&end.guid) {
                return Err(RepositoryError::EntityNotKnown(end.guid.clone()));
            }
        }
        debug!(
            "Adding {} relationship {} between {} and {}",
            relationship.instance_type.type_def_name,
            relationship.guid,
            relationship.entity_one_proxy.guid,
            relationship.entity_two_proxy.guid
        );
        let mut ends = vec![relationship.entity_one_proxy.guid.clone()];
        if relationship.entity_two_proxy.guid != relationship.entity_one_proxy.guid {
            ends.push(relationship.entity_two_proxy.guid.clone());
        }
        for end in ends {
            state
                .relationships_by_entity
                .entry(end)
                .or_default()
                .push(relationship.guid.clone());
        }
        state
            .relationships
            .insert(relationship.guid.clone(), relationship.clone());
        Ok(relationship)
    }

    async fn purge_relationship(&self, relationship_guid: &str) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let removed = state.relationships.remove(relationship_guid).ok_or_else(|| {
            RepositoryError::InvalidParameter(format!(
                "Relationship {} not known",
                relationship_guid
            ))
        })?;
        for end in [&removed.entity_one_proxy.guid, &removed.entity_two_proxy.guid] {
            if let Some(guids) = state.relationships_by_entity.get_mut(end) {
                guids.retain(|guid| guid != relationship_guid);
            }
        }
        Ok(())
    }

    async fn get_entity_detail(&self, entity_guid: &str) -> RepositoryResult<EntityDetail> {
        let state = self.state.read().map_err(lock_poisoned)?;
        state
            .entities
            .get(entity_guid)
            .cloned()
            .ok_or_else(|| RepositoryError::EntityNotKnown(entity_guid.to_string()))
    }

    async fn find_entity_by_qualified_name(
        &self,
        entity_type_guid: &str,
        qualified_name: &str,
    ) -> RepositoryResult<Option<EntityDetail>> {
        ensure_entity_type(entity_type_guid)?;
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .entities
            .values()
            .find(|e| {
                e.instance_type.type_def_guid == entity_type_guid
                    && e.qualified_name().as_deref() == Some(qualified_name)
            })
            .cloned())
    }

    async fn relationship_exists(
        &self,
        relationship_type_guid: &str,
        entity_one_guid: &str,
        entity_two_guid: &str,
    ) -> RepositoryResult<bool> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.relationships_of(entity_one_guid).any(|r| {
            r.instance_type.type_def_guid == relationship_type_guid
                && r.connects(entity_one_guid, entity_two_guid)
        }))
    }
}

#[async_trait]
impl RepositoryQuery for InMemoryRepository {
    async fn find_entities_by_property_value(
        &self,
        entity_type_guid: &str,
        search_criteria: &str,
    ) -> RepositoryResult<Vec<EntityDetail>> {
        ensure_entity_type(entity_type_guid)?;
        let criteria = compile_search_criteria(search_criteria)?;
        let state = self.state.read().map_err(lock_poisoned)?;
        let mut found: Vec<EntityDetail> = state
            .entities
            .values()
            .filter(|e| e.instance_type.type_def_guid == entity_type_guid)
            .filter(|e| matches_search_criteria(e, &criteria))
            .cloned()
            .collect();
        sort_entities(&mut found);
        check_page(found, self.max_page_size)
    }

    async fn find_entity_guid_by_qualified_name(
        &self,
        qualified_name: &str,
    ) -> RepositoryResult<String> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let mut matches: Vec<&EntityDetail> = state
            .entities
            .values()
            .filter(|e| e.qualified_name().as_deref() == Some(qualified_name))
            .collect();
        match matches.len() {
            0 => Err(RepositoryError::EntityNotKnown(qualified_name.to_string())),
            1 => Ok(matches.remove(0).guid.clone()),
            n => Err(RepositoryError::PropertyError(format!(
                "Qualified name {} matches {} entities",
                qualified_name, n
            ))),
        }
    }

    async fn find_relationships_by_guid(
        &self,
        entity_guid: &str,
    ) -> RepositoryResult<Vec<Relationship>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        if !state.entities.contains_key(entity_guid) {
            return Err(RepositoryError::EntityNotKnown(entity_guid.to_string()));
        }
        let mut found: Vec<Relationship> = state.relationships_of(entity_guid).cloned().collect();
        sort_relationships(&mut found);
        check_page(found, self.max_page_size)
    }

    async fn get_related_entities(
        &self,
        entity_guid: &str,
        entity_type_guid: &str,
    ) -> RepositoryResult<Vec<EntityDetail>> {
        ensure_entity_type(entity_type_guid)?;
        let state = self.state.read().map_err(lock_poisoned)?;
        if !state.entities.contains_key(entity_guid) {
            return Err(RepositoryError::EntityNotKnown(entity_guid.to_string()));
        }

        // Breadth-first over structural relationships, one depth at a time,
        // stopping at the first depth that holds a match
        let mut visited: HashSet<&str> = HashSet::from([entity_guid]);
        let mut frontier: Vec<&str> = vec![entity_guid];
        let mut found: Vec<EntityDetail> = Vec::new();

        while found.is_empty() && !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                for relationship in state.relationships_of(current) {
                    if !types::is_structural(&relationship.instance_type.type_def_guid) {
                        continue;
                    }
                    let Some(other) = relationship.other_end(current) else {
                        continue;
                    };
                    if !visited.insert(other.guid.as_str()) {
                        continue;
                    }
                    if let Some(entity) = state.entities.get(&other.guid) {
                        if entity.instance_type.type_def_guid == entity_type_guid {
                            found.push(entity.clone());
                        } else {
                            next.push(entity.guid.as_str());
                        }
                    }
                }
            }
            frontier = next;
        }

        sort_entities(&mut found);
        check_page(found, self.max_page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{QUALIFIED_NAME, TypeDef};

    fn entity(type_def: TypeDef, qualified_name: &str) -> EntityDetail {
        EntityDetail::new(
            type_def,
            InstanceProperties::new().with(QUALIFIED_NAME, qualified_name),
            "tester",
        )
    }

    #[tokio::test]
    async fn test_add_and_find_entity() {
        let repo = InMemoryRepository::new();
        let db = repo.add_entity(entity(types::DATABASE, "db1-qn")).await.unwrap();

        let found = repo
            .find_entities_by_property_value(types::DATABASE.guid, "db1-qn")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].guid, db.guid);
        assert_eq!(repo.entity_count().unwrap(), 1);

        let by_name = repo
            .find_entity_by_qualified_name(types::DATABASE.guid, "db1-qn")
            .await
            .unwrap();
        assert_eq!(by_name.map(|e| e.guid), Some(db.guid));
    }

    #[tokio::test]
    async fn test_relationship_requires_known_ends() {
        let repo = InMemoryRepository::new();
        let a = repo.add_entity(entity(types::TABULAR_COLUMN, "a")).await.unwrap();
        let ghost = entity(types::TABULAR_COLUMN, "ghost");
        let err = repo
            .add_relationship(Relationship::new(types::LINEAGE_MAPPING, &a, &ghost, "tester"))
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::EntityNotKnown(ghost.guid.clone()));
        assert_eq!(repo.relationship_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_related_entities_skip_lineage() {
        let repo = InMemoryRepository::new();
        let file = repo.add_entity(entity(types::DATA_FILE, "f")).await.unwrap();
        let schema = repo
            .add_entity(entity(types::TABULAR_SCHEMA_TYPE, "f::schema"))
            .await
            .unwrap();
        let column = repo.add_entity(entity(types::TABULAR_COLUMN, "f::c")).await.unwrap();
        let other_schema = repo
            .add_entity(entity(types::TABULAR_SCHEMA_TYPE, "g::schema"))
            .await
            .unwrap();
        let other_column = repo.add_entity(entity(types::TABULAR_COLUMN, "g::c")).await.unwrap();

        for (def, one, two) in [
            (types::ASSET_SCHEMA_TYPE, &file, &schema),
            (types::ATTRIBUTE_FOR_SCHEMA, &schema, &column),
            (types::ATTRIBUTE_FOR_SCHEMA, &other_schema, &other_column),
            (types::LINEAGE_MAPPING, &column, &other_column),
        ] {
            repo.add_relationship(Relationship::new(def, one, two, "tester"))
                .await
                .unwrap();
        }

        let schemas = repo
            .get_related_entities(&file.guid, types::TABULAR_SCHEMA_TYPE.guid)
            .await
            .unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].guid, schema.guid);

        let column_rels = repo.find_relationships_by_guid(&column.guid).await.unwrap();
        assert_eq!(column_rels.len(), 2);
    }

    #[tokio::test]
    async fn test_purge_relationship() {
        let repo = InMemoryRepository::new();
        let a = repo.add_entity(entity(types::TABULAR_COLUMN, "a")).await.unwrap();
        let b = repo.add_entity(entity(types::TABULAR_COLUMN, "b")).await.unwrap();
        let rel = repo
            .add_relationship(Relationship::new(types::LINEAGE_MAPPING, &a, &b, "tester"))
            .await
            .unwrap();
        repo.purge_relationship(&rel.guid).await.unwrap();
        assert!(repo.find_relationships_by_guid(&a.guid).await.unwrap().is_empty());
        assert!(repo.purge_relationship(&rel.guid).await.is_err());
    }

    #[tokio::test]
    async fn test_guid_lookup_and_paging() {
        let repo = InMemoryRepository::with_max_page_size(1);
        repo.add_entity(entity(types::TABULAR_COLUMN, "dup")).await.unwrap();
        repo.add_entity(entity(types::RELATIONAL_COLUMN, "dup")).await.unwrap();

        assert!(matches!(
            repo.find_entity_guid_by_qualified_name("dup").await,
            Err(RepositoryError::PropertyError(_))
        ));
        assert!(matches!(
            repo.find_entity_guid_by_qualified_name("missing").await,
            Err(RepositoryError::EntityNotKnown(_))
        ));

        repo.add_entity(entity(types::TABULAR_COLUMN, "other")).await.unwrap();
        let page = repo
            .find_entities_by_property_value(types::TABULAR_COLUMN.guid, ".*")
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_relationship_exists_ignores_paging() {
        let repo = InMemoryRepository::with_max_page_size(1);
        let schema = repo
            .add_entity(entity(types::TABULAR_SCHEMA_TYPE, "f::schema"))
            .await
            .unwrap();
        let mut columns = Vec::new();
        for name in ["f::a", "f::b", "f::c"] {
            let column = repo.add_entity(entity(types::TABULAR_COLUMN, name)).await.unwrap();
            repo.add_relationship(Relationship::new(
                types::ATTRIBUTE_FOR_SCHEMA,
                &schema,
                &column,
                "tester",
            ))
            .await
            .unwrap();
            columns.push(column);
        }

        for column in &columns {
            assert!(
                repo.relationship_exists(types::ATTRIBUTE_FOR_SCHEMA.guid, &column.guid, &schema.guid)
                    .await
                    .unwrap()
            );
        }
        assert!(
            !repo
                .relationship_exists(types::LINEAGE_MAPPING.guid, &schema.guid, &columns[0].guid)
                .await
                .unwrap()
        );
        assert_eq!(repo.find_relationships_by_guid(&schema.guid).await.unwrap().len(), 1);
        assert_eq!(repo.relationship_count().unwrap(), 3);
    }

    #[test]
    fn test_poisoned_lock_is_reported_by_counts() {
        let repo = InMemoryRepository::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = repo.state.write().unwrap();
            panic!("writer died holding the lock");
        }));
        assert!(matches!(
            repo.entity_count(),
            Err(RepositoryError::RepositoryError(_))
        ));
        assert!(matches!(
            repo.relationship_count(),
            Err(RepositoryError::RepositoryError(_))
        ));
    }
}
