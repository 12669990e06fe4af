//! Graph repository backend (`servergraph`)
//!
//! Entities are nodes and relationships are undirected edges of a petgraph
//! `StableGraph`, so removing a relationship never invalidates other indices.

use async_trait::async_trait;
use petgraph::Undirected;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
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

type MetadataGraph = StableGraph<EntityDetail, Relationship, Undirected>;

#[derive(Default)]
struct GraphState {
    graph: MetadataGraph,
    node_map: HashMap<String, NodeIndex>,
    edge_map: HashMap<String, EdgeIndex>,
}

impl GraphState {
    fn node(&self, entity_guid: &str) -> RepositoryResult<NodeIndex> {
        self.node_map
            .get(entity_guid)
            .copied()
            .ok_or_else(|| RepositoryError::EntityNotKnown(entity_guid.to_string()))
    }

    fn entities(&self) -> impl Iterator<Item = &EntityDetail> {
        self.graph
            .node_indices()
            .filter_map(|index| self.graph.node_weight(index))
    }
}

/// Repository storing entities and relationships in a graph
pub struct GraphRepository {
    state: RwLock<GraphState>,
    max_page_size: usize,
}

impl Default for GraphRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphRepository {
    pub fn new() -> Self {
        Self::with_max_page_size(DEFAULT_MAX_PAGE_SIZE)
    }

    pub fn with_max_page_size(max_page_size: usize) -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
            max_page_size,
        }
    }

    pub fn entity_count(&self) -> RepositoryResult<usize> {
        Ok(self.state.read().map_err(lock_poisoned)?.graph.node_count())
    }

    pub fn relationship_count(&self) -> RepositoryResult<usize> {
        Ok(self.state.read().map_err(lock_poisoned)?.graph.edge_count())
    }
}

#[async_trait]
impl MetadataStore for GraphRepository {
    async fn add_entity(&self, entity: EntityDetail) -> RepositoryResult<EntityDetail> {
        ensure_entity_type(&entity.instance_type.type_def_guid)?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.node_map.contains_key(&entity.guid) {
            return Err(RepositoryError::InvalidParameter(format!(
                "Entity {} already exists",
                entity.guid
            )));
        }
        debug!(
            "Adding {} node {}",
            entity.instance_type.type_def_name, entity.guid
        );
        let guid = entity.guid.clone();
        let index = state.graph.add_node(entity.clone());
        state.node_map.insert(guid, index);
        Ok(entity)
    }

    async fn update_entity_properties(
        &self,
        entity_guid: &str,
        properties: InstanceProperties,
        user_id: &str,
    ) -> RepositoryResult<EntityDetail> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let index = state.node(entity_guid)?;
        let entity = state
            .graph
            .node_weight_mut(index)
            .ok_or_else(|| RepositoryError::EntityNotKnown(entity_guid.to_string()))?;
        entity.update(properties, user_id);
        Ok(entity.clone())
    }

    async fn add_relationship(&self, relationship: Relationship) -> RepositoryResult<Relationship> {
        ensure_relationship_type(&relationship.instance_type.type_def_guid)?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let one = state.node(&relationship.entity_one_proxy.guid)?;
        let two = state.node(&relationship.entity_two_proxy.guid)?;
        debug!(
            "Adding {} edge {} between {} and {}",
            relationship.instance_type.type_def_name,
            relationship.guid,
            relationship.entity_one_proxy.guid,
            relationship.entity_two_proxy.guid
        );
        let guid = relationship.guid.clone();
        let edge = state.graph.add_edge(one, two, relationship.clone());
        state.edge_map.insert(guid, edge);
        Ok(relationship)
    }

    async fn purge_relationship(&self, relationship_guid: &str) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let edge = state.edge_map.remove(relationship_guid).ok_or_else(|| {
            RepositoryError::InvalidParameter(format!(
                "Relationship {} not known",
                relationship_guid
            ))
        })?;
        state.graph.remove_edge(edge);
        Ok(())
    }

    async fn get_entity_detail(&self, entity_guid: &str) -> RepositoryResult<EntityDetail> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let index = state.node(entity_guid)?;
        state
            .graph
            .node_weight(index)
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
            .entities()
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
        let Some(&one) = state.node_map.get(entity_one_guid) else {
            return Ok(false);
        };
        Ok(state.graph.edges(one).any(|edge| {
            let relationship = edge.weight();
            relationship.instance_type.type_def_guid == relationship_type_guid
                && relationship.connects(entity_one_guid, entity_two_guid)
        }))
    }
}

#[async_trait]
impl RepositoryQuery for GraphRepository {
    async fn find_entities_by_property_value(
        &self,
        entity_type_guid: &str,
        search_criteria: &str,
    ) -> RepositoryResult<Vec<EntityDetail>> {
        ensure_entity_type(entity_type_guid)?;
        let criteria = compile_search_criteria(search_criteria)?;
        let state = self.state.read().map_err(lock_poisoned)?;
        let mut found: Vec<EntityDetail> = state
            .entities()
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
        let matches: Vec<&EntityDetail> = state
            .entities()
            .filter(|e| e.qualified_name().as_deref() == Some(qualified_name))
            .collect();
        match matches.as_slice() {
            [] => Err(RepositoryError::EntityNotKnown(qualified_name.to_string())),
            [entity] => Ok(entity.guid.clone()),
            _ => Err(RepositoryError::PropertyError(format!(
                "Qualified name {} matches {} entities",
                qualified_name,
                matches.len()
            ))),
        }
    }

    async fn find_relationships_by_guid(
        &self,
        entity_guid: &str,
    ) -> RepositoryResult<Vec<Relationship>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let index = state.node(entity_guid)?;
        let mut found: Vec<Relationship> = state
            .graph
            .edges(index)
            .map(|edge| edge.weight().clone())
            .collect();
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
        let start = state.node(entity_guid)?;

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut frontier: Vec<NodeIndex> = vec![start];
        let mut found: Vec<EntityDetail> = Vec::new();

        while found.is_empty() && !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                for edge in state.graph.edges(current) {
                    if !types::is_structural(&edge.weight().instance_type.type_def_guid) {
                        continue;
                    }
                    let other = if edge.source() == current {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    if !visited.insert(other) {
                        continue;
                    }
                    if let Some(entity) = state.graph.node_weight(other) {
                        if entity.instance_type.type_def_guid == entity_type_guid {
                            found.push(entity.clone());
                        } else {
                            next.push(other);
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
    async fn test_transitive_related_entities() {
        let repo = GraphRepository::new();
        let table = repo
            .add_entity(entity(types::RELATIONAL_TABLE, "db::orders"))
            .await
            .unwrap();
        let schema_type = repo
            .add_entity(entity(types::RELATIONAL_DB_SCHEMA_TYPE, "db::schema"))
            .await
            .unwrap();
        let deployed = repo
            .add_entity(entity(
                types::DEPLOYED_DATABASE_SCHEMA,
                "SchemaOf:db::schema",
            ))
            .await
            .unwrap();
        repo.add_relationship(Relationship::new(
            types::ATTRIBUTE_FOR_SCHEMA,
            &schema_type,
            &table,
            "tester",
        ))
        .await
        .unwrap();
        repo.add_relationship(Relationship::new(
            types::ASSET_SCHEMA_TYPE,
            &deployed,
            &schema_type,
            "tester",
        ))
        .await
        .unwrap();

        let found = repo
            .get_related_entities(&table.guid, types::DEPLOYED_DATABASE_SCHEMA.guid)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].guid, deployed.guid);
        assert_eq!(repo.entity_count().unwrap(), 3);
        assert_eq!(repo.relationship_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_related_entities_stop_at_nearest_match() {
        let repo = GraphRepository::new();
        let db = repo.add_entity(entity(types::DATABASE, "db")).await.unwrap();
        let db_schema = repo
            .add_entity(entity(types::DEPLOYED_DATABASE_SCHEMA, "db:schema"))
            .await
            .unwrap();
        let schema_type = repo
            .add_entity(entity(types::RELATIONAL_DB_SCHEMA_TYPE, "db::schema"))
            .await
            .unwrap();
        let table_schema = repo
            .add_entity(entity(types::DEPLOYED_DATABASE_SCHEMA, "SchemaOf:db::schema"))
            .await
            .unwrap();
        let table = repo
            .add_entity(entity(types::RELATIONAL_TABLE, "db::orders"))
            .await
            .unwrap();
        for (def, one, two) in [
            (types::DATA_CONTENT_FOR_DATA_SET, &db, &db_schema),
            (types::ASSET_SCHEMA_TYPE, &db, &schema_type),
            (types::ASSET_SCHEMA_TYPE, &table_schema, &schema_type),
            (types::ATTRIBUTE_FOR_SCHEMA, &schema_type, &table),
        ] {
            repo.add_relationship(Relationship::new(def, one, two, "tester"))
                .await
                .unwrap();
        }

        let from_db = repo
            .get_related_entities(&db.guid, types::DEPLOYED_DATABASE_SCHEMA.guid)
            .await
            .unwrap();
        assert_eq!(from_db.len(), 1);
        assert_eq!(from_db[0].guid, db_schema.guid);

        let from_table = repo
            .get_related_entities(&table.guid, types::DEPLOYED_DATABASE_SCHEMA.guid)
            .await
            .unwrap();
        assert_eq!(from_table.len(), 1);
        assert_eq!(from_table[0].guid, table_schema.guid);

        let tables = repo
            .get_related_entities(&db.guid, types::RELATIONAL_TABLE.guid)
            .await
            .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].guid, table.guid);
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = GraphRepository::new();
        let db = repo.add_entity(entity(types::DATABASE, "db1-qn")).await.unwrap();
        let updated = repo
            .update_entity_properties(
                &db.guid,
                InstanceProperties::new().with(types::NAME, "db1"),
                "updater",
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.updated_by.as_deref(), Some("updater"));
        assert_eq!(
            repo.get_entity_detail(&db.guid)
                .await
                .unwrap()
                .properties
                .string_value(types::NAME)
                .as_deref(),
            Some("db1")
        );
    }

    #[tokio::test]
    async fn test_unknown_entity_errors() {
        let repo = GraphRepository::new();
        assert!(matches!(
            repo.find_relationships_by_guid("nope").await,
            Err(RepositoryError::EntityNotKnown(_))
        ));
        assert!(matches!(
            repo.get_related_entities("nope", types::DATABASE.guid).await,
            Err(RepositoryError::EntityNotKnown(_))
        ));
        assert!(matches!(
            repo.find_entities_by_property_value("not-a-type", "x").await,
            Err(RepositoryError::TypeError(_))
        ));
    }

    #[test]
    fn test_poisoned_lock_is_reported_by_counts() {
        let repo = GraphRepository::new();
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
