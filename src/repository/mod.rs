//! Metadata repository abstraction
//!
//! The repository is split into two seams:
//! - [`MetadataStore`]: the write side used by the data engine
//! - [`RepositoryQuery`]: the read side used by the verification harness
//!
//! Two backend variants implement both seams with identical observable
//! behaviour:
//! - [`InMemoryRepository`]: hash maps keyed by GUID (`serverinmem`)
//! - [`GraphRepository`]: a petgraph graph of entities and relationships (`servergraph`)

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

use crate::models::types::{self, TypeDefCategory};
use crate::models::{EntityDetail, InstanceProperties, Relationship};

pub mod graph;
pub mod in_memory;
pub mod service;

pub use graph::GraphRepository;
pub use in_memory::InMemoryRepository;
pub use service::RepositoryService;

/// Default upper bound on the number of instances a single query returns
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Error type for repository operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("User not authorized: {0}")]
    UserNotAuthorized(String),

    #[error("Function not supported: {0}")]
    FunctionNotSupported(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Property error: {0}")]
    PropertyError(String),

    #[error("Paging error: {0}")]
    PagingError(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Entity not known: {0}")]
    EntityNotKnown(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Write side of a metadata repository
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store a new entity
    async fn add_entity(&self, entity: EntityDetail) -> RepositoryResult<EntityDetail>;

    /// Overlay properties onto an existing entity
    async fn update_entity_properties(
        &self,
        entity_guid: &str,
        properties: InstanceProperties,
        user_id: &str,
    ) -> RepositoryResult<EntityDetail>;

    /// Store a new relationship; both ends must already exist
    async fn add_relationship(&self, relationship: Relationship) -> RepositoryResult<Relationship>;

    /// Remove a relationship
    async fn purge_relationship(&self, relationship_guid: &str) -> RepositoryResult<()>;

    /// Fetch an entity by GUID
    async fn get_entity_detail(&self, entity_guid: &str) -> RepositoryResult<EntityDetail>;

    /// Find the entity of the given type carrying this qualified name
    async fn find_entity_by_qualified_name(
        &self,
        entity_type_guid: &str,
        qualified_name: &str,
    ) -> RepositoryResult<Option<EntityDetail>>;

    /// Whether a relationship of this type already connects the two entities,
    /// in either direction. Not subject to paging.
    async fn relationship_exists(
        &self,
        relationship_type_guid: &str,
        entity_one_guid: &str,
        entity_two_guid: &str,
    ) -> RepositoryResult<bool>;
}

/// Read side of a metadata repository
#[async_trait]
pub trait RepositoryQuery: Send + Sync {
    /// Entities of a type whose string properties match the regular expression
    async fn find_entities_by_property_value(
        &self,
        entity_type_guid: &str,
        search_criteria: &str,
    ) -> RepositoryResult<Vec<EntityDetail>>;

    /// GUID of the single entity, of any type, carrying this qualified name
    async fn find_entity_guid_by_qualified_name(
        &self,
        qualified_name: &str,
    ) -> RepositoryResult<String>;

    /// Relationships touching the entity
    async fn find_relationships_by_guid(
        &self,
        entity_guid: &str,
    ) -> RepositoryResult<Vec<Relationship>>;

    /// Nearest entities of a type reachable from the start entity
    ///
    /// Walks structural relationships breadth first and returns every match
    /// found at the first distance that holds one. Lineage is not followed.
    async fn get_related_entities(
        &self,
        entity_guid: &str,
        entity_type_guid: &str,
    ) -> RepositoryResult<Vec<EntityDetail>>;
}

/// A repository offering both the write and read seams
pub trait MetadataCollection: MetadataStore + RepositoryQuery {}

impl<T: MetadataStore + RepositoryQuery> MetadataCollection for T {}

/// Configured repository backend a server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServerVariant {
    /// Hash-map backed repository
    #[default]
    #[serde(rename = "serverinmem")]
    InMemory,
    /// Graph backed repository
    #[serde(rename = "servergraph")]
    Graph,
}

impl ServerVariant {
    pub const ALL: [ServerVariant; 2] = [ServerVariant::InMemory, ServerVariant::Graph];

    /// Server name used on the connection table
    pub fn server_name(&self) -> &'static str {
        match self {
            ServerVariant::InMemory => "serverinmem",
            ServerVariant::Graph => "servergraph",
        }
    }

    /// Create a fresh, empty repository of this variant
    pub fn create_repository(&self) -> Arc<dyn MetadataCollection> {
        match self {
            ServerVariant::InMemory => Arc::new(InMemoryRepository::new()),
            ServerVariant::Graph => Arc::new(GraphRepository::new()),
        }
    }
}

impl FromStr for ServerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serverinmem" | "in-memory" | "inmemory" => Ok(ServerVariant::InMemory),
            "servergraph" | "graph" => Ok(ServerVariant::Graph),
            _ => Err(format!(
                "Unknown server variant: {}. Use 'serverinmem' or 'servergraph'.",
                s
            )),
        }
    }
}

impl fmt::Display for ServerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.server_name())
    }
}

/// Reject type GUIDs that are unknown or do not describe entities
pub(crate) fn ensure_entity_type(entity_type_guid: &str) -> RepositoryResult<()> {
    match types::type_def_by_guid(entity_type_guid) {
        Some(def) if def.category == TypeDefCategory::Entity => Ok(()),
        Some(def) => Err(RepositoryError::TypeError(format!(
            "{} is a relationship type, not an entity type",
            def.name
        ))),
        None => Err(RepositoryError::TypeError(format!(
            "Unknown entity type GUID: {}",
            entity_type_guid
        ))),
    }
}

/// Reject relationship type GUIDs that are unknown or describe entities
pub(crate) fn ensure_relationship_type(relationship_type_guid: &str) -> RepositoryResult<()> {
    match types::type_def_by_guid(relationship_type_guid) {
        Some(def) if def.category == TypeDefCategory::Relationship => Ok(()),
        _ => Err(RepositoryError::TypeError(format!(
            "Unknown relationship type GUID: {}",
            relationship_type_guid
        ))),
    }
}

/// Compile search criteria, anchored to the whole property value
pub(crate) fn compile_search_criteria(search_criteria: &str) -> RepositoryResult<Regex> {
    if search_criteria.is_empty() {
        return Err(RepositoryError::InvalidParameter(
            "search criteria must not be empty".to_string(),
        ));
    }
    Regex::new(&format!("^(?:{})$", search_criteria)).map_err(|e| {
        RepositoryError::PropertyError(format!("Invalid search criteria {}: {}", search_criteria, e))
    })
}

/// Whether any string property of the entity matches the criteria
pub(crate) fn matches_search_criteria(entity: &EntityDetail, criteria: &Regex) -> bool {
    entity
        .properties
        .iter()
        .any(|(_, value)| value.as_str().is_some_and(|s| criteria.is_match(s)))
}

/// Cut a sorted result set down to the first page
///
/// A page size of zero can never return anything and is rejected.
pub(crate) fn check_page<T>(mut results: Vec<T>, max_page_size: usize) -> RepositoryResult<Vec<T>> {
    if max_page_size == 0 {
        return Err(RepositoryError::PagingError(
            "maximum page size must be greater than zero".to_string(),
        ));
    }
    if results.len() > max_page_size {
        warn!(
            "Returning the first {} of {} results",
            max_page_size,
            results.len()
        );
        results.truncate(max_page_size);
    }
    Ok(results)
}

/// Order instances by creation time so both backends return the same sequence
pub(crate) fn sort_entities(entities: &mut [EntityDetail]) {
    entities.sort_by(|a, b| {
        a.create_time
            .cmp(&b.create_time)
            .then_with(|| a.guid.cmp(&b.guid))
    });
}

pub(crate) fn sort_relationships(relationships: &mut [Relationship]) {
    relationships.sort_by(|a, b| {
        a.create_time
            .cmp(&b.create_time)
            .then_with(|| a.guid.cmp(&b.guid))
    });
}

pub(crate) fn lock_poisoned<E>(_: E) -> RepositoryError {
    RepositoryError::RepositoryError("repository lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_variant_from_str() {
        assert_eq!(
            "serverinmem".parse::<ServerVariant>().unwrap(),
            ServerVariant::InMemory
        );
        assert_eq!(
            "servergraph".parse::<ServerVariant>().unwrap(),
            ServerVariant::Graph
        );
        assert_eq!("Graph".parse::<ServerVariant>().unwrap(), ServerVariant::Graph);
        assert!("serverdisk".parse::<ServerVariant>().is_err());
    }

    #[test]
    fn test_search_criteria_is_anchored() {
        let regex = compile_search_criteria(&regex::escape("db1-qn")).unwrap();
        assert!(regex.is_match("db1-qn"));
        assert!(!regex.is_match("db1-qn:schema"));
        assert!(compile_search_criteria("").is_err());
        assert!(matches!(
            compile_search_criteria("(unclosed"),
            Err(RepositoryError::PropertyError(_))
        ));
    }

    #[test]
    fn test_type_guards() {
        assert!(ensure_entity_type(types::DATABASE.guid).is_ok());
        assert!(matches!(
            ensure_entity_type(types::LINEAGE_MAPPING.guid),
            Err(RepositoryError::TypeError(_))
        ));
        assert!(ensure_relationship_type(types::LINEAGE_MAPPING.guid).is_ok());
        assert!(ensure_relationship_type(types::DATABASE.guid).is_err());
    }

    #[test]
    fn test_check_page() {
        assert_eq!(check_page(vec![1, 2], 2).unwrap(), vec![1, 2]);
        assert_eq!(check_page(vec![1, 2, 3], 2).unwrap(), vec![1, 2]);
        assert!(matches!(
            check_page(vec![1], 0),
            Err(RepositoryError::PagingError(_))
        ));
    }
}
