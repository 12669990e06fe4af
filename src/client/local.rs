//! In-process data engine
//!
//! Applies the data engine's upsert and derivation rules directly onto a
//! metadata repository, so the harness can run without a remote server.
//!
//! Derived structure:
//! - Database -DataContentForDataSet- DeployedDatabaseSchema (`<db>:schema`)
//! - RelationalTable -AttributeForSchema- RelationalDBSchemaType (`<db>::schema`)
//!   -AssetSchemaType- DeployedDatabaseSchema (`SchemaOf:<db>::schema`)
//! - Database -AssetSchemaType- RelationalDBSchemaType; the database must exist
//!   before a table is upserted into it
//! - RelationalTable -NestedSchemaAttribute- RelationalColumn
//! - DataFile -AssetSchemaType- TabularSchemaType (`<file>::schema`, name `Schema`)
//!   -AttributeForSchema- TabularColumn
//! - Process -ProcessPort- PortImplementation -PortSchema- TabularSchemaType
//!   -AttributeForSchema- TabularColumn
//! - attribute -LineageMapping- attribute

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ClientError, ClientResult, DataEngineClient};
use crate::models::types::{self, TypeDef};
use crate::models::{
    Column, DataFile, Database, EntityDetail, InstanceProperties, LineageMapping, Process,
    RelationalTable, Relationship, SoftwareServerCapability,
};
use crate::repository::MetadataCollection;

/// Data engine running in the same process as the harness
pub struct LocalDataEngine<R: MetadataCollection + ?Sized> {
    repository: Arc<R>,
    server_name: String,
    authorized_users: Vec<String>,
    external_source_name: Option<String>,
}

impl<R: MetadataCollection + ?Sized> LocalDataEngine<R> {
    pub fn new(server_name: impl Into<String>, repository: Arc<R>) -> Self {
        Self {
            repository,
            server_name: server_name.into(),
            authorized_users: Vec::new(),
            external_source_name: None,
        }
    }

    /// Restrict access to the listed users; an empty list admits everyone
    pub fn with_authorized_users(mut self, users: Vec<String>) -> Self {
        self.authorized_users = users;
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn authorize(&self, user_id: &str) -> ClientResult<()> {
        if user_id.trim().is_empty() {
            return Err(ClientError::InvalidParameter(
                "userId must not be empty".to_string(),
            ));
        }
        if !self.authorized_users.is_empty() && !self.authorized_users.iter().any(|u| u == user_id)
        {
            return Err(ClientError::UserNotAuthorized(format!(
                "{} is not authorized to use server {}",
                user_id, self.server_name
            )));
        }
        Ok(())
    }

    /// Authorize the user and resolve the registered external source
    async fn require_external_source(&self, user_id: &str) -> ClientResult<String> {
        self.authorize(user_id)?;
        let source = self.external_source_name.clone().ok_or_else(|| {
            ClientError::InvalidParameter("external source name is not set".to_string())
        })?;
        let registered = self
            .repository
            .find_entity_by_qualified_name(types::SOFTWARE_SERVER_CAPABILITY.guid, &source)
            .await?;
        if registered.is_none() {
            return Err(ClientError::InvalidParameter(format!(
                "external source {} is not a registered capability",
                source
            )));
        }
        Ok(source)
    }

    /// Update the entity of this type and qualified name, or create it
    async fn upsert_entity(
        &self,
        type_def: TypeDef,
        qualified_name: &str,
        mut properties: InstanceProperties,
        user_id: &str,
    ) -> ClientResult<EntityDetail> {
        if qualified_name.trim().is_empty() {
            return Err(ClientError::InvalidParameter(format!(
                "qualifiedName of {} must not be empty",
                type_def.name
            )));
        }
        properties.set(types::QUALIFIED_NAME, qualified_name);

        let existing = self
            .repository
            .find_entity_by_qualified_name(type_def.guid, qualified_name)
            .await?;
        let entity = match existing {
            Some(entity) => {
                debug!("Updating {} {}", type_def.name, qualified_name);
                self.repository
                    .update_entity_properties(&entity.guid, properties, user_id)
                    .await?
            }
            None => {
                debug!("Creating {} {}", type_def.name, qualified_name);
                self.repository
                    .add_entity(EntityDetail::new(type_def, properties, user_id))
                    .await?
            }
        };
        Ok(entity)
    }

    /// Create the relationship unless one of the same type already connects the pair
    async fn ensure_relationship(
        &self,
        type_def: TypeDef,
        one: &EntityDetail,
        two: &EntityDetail,
        user_id: &str,
    ) -> ClientResult<()> {
        let already_linked = self
            .repository
            .relationship_exists(type_def.guid, &one.guid, &two.guid)
            .await?;
        if !already_linked {
            self.repository
                .add_relationship(Relationship::new(type_def, one, two, user_id))
                .await?;
        }
        Ok(())
    }

    async fn upsert_columns(
        &self,
        parent: &EntityDetail,
        columns: &[Column],
        column_type: TypeDef,
        relationship_type: TypeDef,
        user_id: &str,
    ) -> ClientResult<()> {
        for column in columns {
            let mut properties = InstanceProperties::new();
            properties.set(types::DISPLAY_NAME, column.display_name.as_str());
            properties.set(types::DESCRIPTION, column.description.as_str());
            properties.set(types::POSITION, column.position);
            properties.set_non_empty(types::DATA_TYPE, &column.data_type);
            let entity = self
                .upsert_entity(column_type, &column.qualified_name, properties, user_id)
                .await?;
            self.ensure_relationship(relationship_type, parent, &entity, user_id)
                .await?;
        }
        Ok(())
    }

    async fn link_lineage_mapping(
        &self,
        mapping: &LineageMapping,
        user_id: &str,
    ) -> ClientResult<()> {
        let source_guid = self
            .repository
            .find_entity_guid_by_qualified_name(&mapping.source_attribute)
            .await?;
        let target_guid = self
            .repository
            .find_entity_guid_by_qualified_name(&mapping.target_attribute)
            .await?;
        let source = self.repository.get_entity_detail(&source_guid).await?;
        let target = self.repository.get_entity_detail(&target_guid).await?;
        self.ensure_relationship(types::LINEAGE_MAPPING, &source, &target, user_id)
            .await
    }
}

#[async_trait]
impl<R: MetadataCollection + ?Sized> DataEngineClient for LocalDataEngine<R> {
    fn external_source_name(&self) -> Option<&str> {
        self.external_source_name.as_deref()
    }

    fn set_external_source_name(&mut self, external_source_name: &str) {
        self.external_source_name = Some(external_source_name.to_string());
    }

    async fn create_external_data_engine(
        &self,
        user_id: &str,
        capability: &SoftwareServerCapability,
    ) -> ClientResult<String> {
        self.authorize(user_id)?;
        let properties = InstanceProperties::new()
            .with(types::NAME, capability.name.as_str())
            .with(types::TYPE, capability.engine_type.as_str())
            .with(types::VERSION, capability.engine_version.as_str())
            .with(types::PATCH_LEVEL, capability.patch_level.as_str())
            .with(types::SOURCE, capability.source.as_str())
            .with(types::DESCRIPTION, capability.description.as_str());
        let entity = self
            .upsert_entity(
                types::SOFTWARE_SERVER_CAPABILITY,
                &capability.qualified_name,
                properties,
                user_id,
            )
            .await?;
        info!(
            "Registered external data engine {} on {}",
            capability.qualified_name, self.server_name
        );
        Ok(entity.guid)
    }

    async fn upsert_database(&self, user_id: &str, database: &Database) -> ClientResult<String> {
        self.require_external_source(user_id).await?;
        let properties = InstanceProperties::new()
            .with(types::NAME, database.display_name.as_str())
            .with(types::DESCRIPTION, database.description.as_str())
            .with(
                types::DEPLOYED_IMPLEMENTATION_TYPE,
                database.database_type.as_str(),
            )
            .with(types::DATABASE_VERSION, database.database_version.as_str())
            .with(types::INSTANCE, database.database_instance.as_str())
            .with(types::IMPORTED_FROM, database.database_imported_from.as_str());
        let entity = self
            .upsert_entity(
                types::DATABASE,
                &database.qualified_name,
                properties,
                user_id,
            )
            .await?;

        let schema_name = types::deployed_schema_qualified_name(&database.qualified_name);
        let schema = self
            .upsert_entity(
                types::DEPLOYED_DATABASE_SCHEMA,
                &schema_name,
                InstanceProperties::new().with(types::NAME, schema_name.as_str()),
                user_id,
            )
            .await?;
        self.ensure_relationship(types::DATA_CONTENT_FOR_DATA_SET, &entity, &schema, user_id)
            .await?;

        info!("Upserted database {}", database.qualified_name);
        Ok(entity.guid)
    }

    async fn upsert_relational_table(
        &self,
        user_id: &str,
        table: &RelationalTable,
        database_qualified_name: &str,
    ) -> ClientResult<String> {
        self.require_external_source(user_id).await?;
        if database_qualified_name.trim().is_empty() {
            return Err(ClientError::InvalidParameter(
                "databaseQualifiedName must not be empty".to_string(),
            ));
        }
        let database = self
            .repository
            .find_entity_by_qualified_name(types::DATABASE.guid, database_qualified_name)
            .await?
            .ok_or_else(|| ClientError::EntityNotKnown(database_qualified_name.to_string()))?;

        let schema_type_name = types::schema_type_qualified_name(database_qualified_name);
        let schema_type = self
            .upsert_entity(
                types::RELATIONAL_DB_SCHEMA_TYPE,
                &schema_type_name,
                InstanceProperties::new().with(types::DISPLAY_NAME, database_qualified_name),
                user_id,
            )
            .await?;
        let deployed_name = types::schema_of_qualified_name(&schema_type_name);
        let deployed = self
            .upsert_entity(
                types::DEPLOYED_DATABASE_SCHEMA,
                &deployed_name,
                InstanceProperties::new().with(types::NAME, deployed_name.as_str()),
                user_id,
            )
            .await?;
        self.ensure_relationship(types::ASSET_SCHEMA_TYPE, &deployed, &schema_type, user_id)
            .await?;
        self.ensure_relationship(types::ASSET_SCHEMA_TYPE, &database, &schema_type, user_id)
            .await?;

        let properties = InstanceProperties::new()
            .with(types::DISPLAY_NAME, table.display_name.as_str())
            .with(types::DESCRIPTION, table.description.as_str());
        let entity = self
            .upsert_entity(
                types::RELATIONAL_TABLE,
                &table.qualified_name,
                properties,
                user_id,
            )
            .await?;
        self.ensure_relationship(types::ATTRIBUTE_FOR_SCHEMA, &schema_type, &entity, user_id)
            .await?;
        self.upsert_columns(
            &entity,
            &table.columns,
            types::RELATIONAL_COLUMN,
            types::NESTED_SCHEMA_ATTRIBUTE,
            user_id,
        )
        .await?;

        info!(
            "Upserted relational table {} with {} columns",
            table.qualified_name,
            table.columns.len()
        );
        Ok(entity.guid)
    }

    async fn upsert_data_file(&self, user_id: &str, data_file: &DataFile) -> ClientResult<String> {
        self.require_external_source(user_id).await?;
        let properties = InstanceProperties::new()
            .with(types::NAME, data_file.display_name.as_str())
            .with(types::DESCRIPTION, data_file.description.as_str())
            .with(types::FILE_TYPE, data_file.file_type.as_str());
        let entity = self
            .upsert_entity(
                types::DATA_FILE,
                &data_file.qualified_name,
                properties,
                user_id,
            )
            .await?;

        let schema_name = types::schema_type_qualified_name(&data_file.qualified_name);
        let schema = self
            .upsert_entity(
                types::TABULAR_SCHEMA_TYPE,
                &schema_name,
                InstanceProperties::new().with(types::NAME, types::TABULAR_SCHEMA_NAME),
                user_id,
            )
            .await?;
        self.ensure_relationship(types::ASSET_SCHEMA_TYPE, &entity, &schema, user_id)
            .await?;
        self.upsert_columns(
            &schema,
            &data_file.columns,
            types::TABULAR_COLUMN,
            types::ATTRIBUTE_FOR_SCHEMA,
            user_id,
        )
        .await?;

        info!(
            "Upserted data file {} with {} columns",
            data_file.qualified_name,
            data_file.columns.len()
        );
        Ok(entity.guid)
    }

    async fn create_or_update_process(
        &self,
        user_id: &str,
        process: &Process,
    ) -> ClientResult<String> {
        self.require_external_source(user_id).await?;
        let mut properties = InstanceProperties::new()
            .with(types::DISPLAY_NAME, process.display_name.as_str())
            .with(types::DESCRIPTION, process.description.as_str());
        properties.set_non_empty(types::NAME, &process.name);
        properties.set_non_empty(types::OWNER, &process.owner);
        let entity = self
            .upsert_entity(types::PROCESS, &process.qualified_name, properties, user_id)
            .await?;

        for port in &process.port_implementations {
            let port_entity = self
                .upsert_entity(
                    types::PORT_IMPLEMENTATION,
                    &port.qualified_name,
                    InstanceProperties::new()
                        .with(types::DISPLAY_NAME, port.display_name.as_str())
                        .with(types::PORT_TYPE, port.port_type.to_string()),
                    user_id,
                )
                .await?;
            self.ensure_relationship(types::PROCESS_PORT, &entity, &port_entity, user_id)
                .await?;

            let schema = self
                .upsert_entity(
                    types::TABULAR_SCHEMA_TYPE,
                    &port.schema_type.qualified_name,
                    InstanceProperties::new()
                        .with(types::DISPLAY_NAME, port.schema_type.display_name.as_str()),
                    user_id,
                )
                .await?;
            self.ensure_relationship(types::PORT_SCHEMA, &port_entity, &schema, user_id)
                .await?;
            self.upsert_columns(
                &schema,
                &port.schema_type.attributes,
                types::TABULAR_COLUMN,
                types::ATTRIBUTE_FOR_SCHEMA,
                user_id,
            )
            .await?;
        }

        for mapping in &process.lineage_mappings {
            self.link_lineage_mapping(mapping, user_id).await?;
        }

        info!(
            "Upserted process {} with {} ports and {} lineage mappings",
            process.qualified_name,
            process.port_implementations.len(),
            process.lineage_mappings.len()
        );
        Ok(entity.guid)
    }

    async fn add_lineage_mappings(
        &self,
        user_id: &str,
        lineage_mappings: &[LineageMapping],
    ) -> ClientResult<()> {
        self.require_external_source(user_id).await?;
        for mapping in lineage_mappings {
            self.link_lineage_mapping(mapping, user_id).await?;
        }
        debug!("Added {} lineage mappings", lineage_mappings.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepository, MetadataStore, RepositoryQuery};

    fn capability() -> SoftwareServerCapability {
        SoftwareServerCapability {
            qualified_name: "(engine)=test-engine".to_string(),
            name: "test-engine".to_string(),
            engine_type: "DataEngine".to_string(),
            engine_version: "1".to_string(),
            patch_level: "0".to_string(),
            source: "unit".to_string(),
            description: "engine used by unit tests".to_string(),
        }
    }

    fn database() -> Database {
        Database {
            qualified_name: "db1-qn".to_string(),
            display_name: "db1".to_string(),
            description: "test database".to_string(),
            database_type: "postgres".to_string(),
            database_version: "13".to_string(),
            database_instance: "inst".to_string(),
            database_imported_from: "import".to_string(),
        }
    }

    async fn registered_engine() -> (Arc<InMemoryRepository>, LocalDataEngine<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let mut engine = LocalDataEngine::new("serverinmem", Arc::clone(&repo));
        let cap = capability();
        engine.create_external_data_engine("tester", &cap).await.unwrap();
        engine.set_external_source_name(&cap.qualified_name);
        (repo, engine)
    }

    #[tokio::test]
    async fn test_upsert_requires_external_source() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut engine = LocalDataEngine::new("serverinmem", repo);
        let err = engine.upsert_database("tester", &database()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameter(_)));

        engine.set_external_source_name("(engine)=never-registered");
        let err = engine.upsert_database("tester", &database()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_authorization() {
        let repo = Arc::new(InMemoryRepository::new());
        let engine = LocalDataEngine::new("serverinmem", repo)
            .with_authorized_users(vec!["garygeeke".to_string()]);
        assert!(matches!(
            engine.create_external_data_engine("", &capability()).await,
            Err(ClientError::InvalidParameter(_))
        ));
        assert!(matches!(
            engine.create_external_data_engine("mallory", &capability()).await,
            Err(ClientError::UserNotAuthorized(_))
        ));
        assert!(
            engine
                .create_external_data_engine("garygeeke", &capability())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_upsert_database_is_idempotent() {
        let (repo, engine) = registered_engine().await;
        let first = engine.upsert_database("tester", &database()).await.unwrap();
        let mut changed = database();
        changed.description = "changed".to_string();
        let second = engine.upsert_database("tester", &changed).await.unwrap();
        assert_eq!(first, second);

        let schemas = repo
            .get_related_entities(&first, types::DEPLOYED_DATABASE_SCHEMA.guid)
            .await
            .unwrap();
        assert_eq!(schemas.len(), 1);
        let stored = repo.get_entity_detail(&first).await.unwrap();
        assert_eq!(
            stored.properties.string_value(types::DESCRIPTION).as_deref(),
            Some("changed")
        );
        assert_eq!(stored.version, 2);
    }

    fn table() -> RelationalTable {
        RelationalTable {
            qualified_name: "db1-qn::(table)=t".to_string(),
            display_name: "t".to_string(),
            description: "test table".to_string(),
            columns: vec![Column::new("db1-qn::(table)=t::(column)=c", "c")],
        }
    }

    #[tokio::test]
    async fn test_table_in_unknown_database_is_rejected() {
        let (repo, engine) = registered_engine().await;
        let before = repo.entity_count().unwrap();
        let err = engine
            .upsert_relational_table("tester", &table(), "db1-qn")
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::EntityNotKnown("db1-qn".to_string()));
        assert_eq!(repo.entity_count().unwrap(), before);
    }

    #[tokio::test]
    async fn test_table_belongs_to_its_database() {
        let (repo, engine) = registered_engine().await;
        let database_guid = engine.upsert_database("tester", &database()).await.unwrap();
        let table_guid = engine
            .upsert_relational_table("tester", &table(), "db1-qn")
            .await
            .unwrap();

        let tables = repo
            .get_related_entities(&database_guid, types::RELATIONAL_TABLE.guid)
            .await
            .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].guid, table_guid);

        // each owner still sees only its own deployed schema
        let database_schemas = repo
            .get_related_entities(&database_guid, types::DEPLOYED_DATABASE_SCHEMA.guid)
            .await
            .unwrap();
        assert_eq!(database_schemas.len(), 1);
        assert_eq!(database_schemas[0].qualified_name().as_deref(), Some("db1-qn:schema"));
        let table_schemas = repo
            .get_related_entities(&table_guid, types::DEPLOYED_DATABASE_SCHEMA.guid)
            .await
            .unwrap();
        assert_eq!(table_schemas.len(), 1);
        assert_eq!(
            table_schemas[0].qualified_name().as_deref(),
            Some("SchemaOf:db1-qn::schema")
        );
    }

    #[tokio::test]
    async fn test_lineage_to_unknown_attribute_fails() {
        let (_repo, engine) = registered_engine().await;
        let err = engine
            .add_lineage_mappings("tester", &[LineageMapping::new("missing-a", "missing-b")])
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::EntityNotKnown("missing-a".to_string()));
    }

    #[tokio::test]
    async fn test_empty_qualified_name_rejected() {
        let (_repo, engine) = registered_engine().await;
        let mut db = database();
        db.qualified_name = String::new();
        assert!(matches!(
            engine.upsert_database("tester", &db).await,
            Err(ClientError::InvalidParameter(_))
        ));
    }
}
