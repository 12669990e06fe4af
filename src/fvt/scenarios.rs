//! Data engine scenarios
//!
//! Each scenario submits fixtures through the connection's client and then
//! reads the repository back through the connection's repository service.

use tracing::{debug, info};

use super::Scenario;
use super::connection::FvtConnection;
use crate::client::DataEngineClient;
use crate::models::types;
use crate::setup::{DataStoreSetupService, ProcessSetupService};
use crate::verification::{
    VerificationError, VerificationResult, assert_guid, assert_properties, assert_property,
    expect_single_entity, expect_single_related, verify_column_lineages,
};

/// The data engine scenario set with its setup invokers
#[derive(Debug, Clone, Default)]
pub struct DataEngineFvt {
    pub processes: ProcessSetupService,
    pub data_stores: DataStoreSetupService,
}

impl DataEngineFvt {
    pub fn new(processes: ProcessSetupService, data_stores: DataStoreSetupService) -> Self {
        Self {
            processes,
            data_stores,
        }
    }

    pub async fn run(&self, scenario: Scenario, conn: &mut FvtConnection) -> VerificationResult<()> {
        debug!("Running {} against {}", scenario, conn.details);
        match scenario {
            Scenario::RegisterExternalTool => self.register_external_tool(conn).await,
            Scenario::VerifyLineageMappingsForAJobProcess => {
                self.verify_lineage_mappings_for_a_job_process(conn).await
            }
            Scenario::UpsertDatabase => self.upsert_database(conn).await,
            Scenario::UpsertRelationalTable => self.upsert_relational_table(conn).await,
            Scenario::UpsertDataFile => self.upsert_data_file(conn).await,
        }
    }

    /// Data store upserts need a registered external source
    async fn ensure_external_source(&self, conn: &mut FvtConnection) -> VerificationResult<()> {
        if conn.client.external_source_name().is_none() {
            let user_id = conn.details.user_id.clone();
            self.processes
                .create_external_data_engine(&user_id, &mut conn.client)
                .await?;
        }
        Ok(())
    }

    pub async fn register_external_tool(&self, conn: &mut FvtConnection) -> VerificationResult<()> {
        let user_id = conn.details.user_id.clone();
        let submitted = self
            .processes
            .create_external_data_engine(&user_id, &mut conn.client)
            .await?;
        let capability = &submitted.descriptor;

        let entity = expect_single_entity(
            &conn.repository_service,
            types::SOFTWARE_SERVER_CAPABILITY,
            &capability.qualified_name,
        )
        .await?;
        assert_guid(&entity, &submitted.guid)?;
        assert_properties(
            &entity,
            &[
                (types::DESCRIPTION, capability.description.as_str()),
                (types::NAME, capability.name.as_str()),
                (types::TYPE, capability.engine_type.as_str()),
                (types::VERSION, capability.engine_version.as_str()),
                (types::PATCH_LEVEL, capability.patch_level.as_str()),
                (types::QUALIFIED_NAME, capability.qualified_name.as_str()),
                (types::SOURCE, capability.source.as_str()),
            ],
        )?;
        info!("External tool {} verified", capability.qualified_name);
        Ok(())
    }

    pub async fn verify_lineage_mappings_for_a_job_process(
        &self,
        conn: &mut FvtConnection,
    ) -> VerificationResult<()> {
        let user_id = conn.details.user_id.clone();
        self.processes
            .create_external_data_engine(&user_id, &mut conn.client)
            .await?;
        self.processes
            .create_job_process_with_content(&user_id, &conn.client)
            .await?;

        let column_lineages = self
            .processes
            .job_process_lineage_mappings_proxies_by_csv_column();
        let checked = verify_column_lineages(&conn.repository_service, &column_lineages).await?;
        info!(
            "Lineage of {} columns verified over {} attributes",
            column_lineages.len(),
            checked
        );
        Ok(())
    }

    pub async fn upsert_database(&self, conn: &mut FvtConnection) -> VerificationResult<()> {
        self.ensure_external_source(conn).await?;
        let submitted = self
            .data_stores
            .upsert_database(conn.user_id(), &conn.client)
            .await?;
        let database = &submitted.descriptor;
        let service = &conn.repository_service;

        let entity = expect_single_entity(service, types::DATABASE, &database.qualified_name).await?;
        assert_guid(&entity, &submitted.guid)?;
        assert_properties(
            &entity,
            &[
                (types::NAME, database.display_name.as_str()),
                (types::DESCRIPTION, database.description.as_str()),
                (types::DEPLOYED_IMPLEMENTATION_TYPE, database.database_type.as_str()),
                (types::DATABASE_VERSION, database.database_version.as_str()),
                (types::INSTANCE, database.database_instance.as_str()),
                (types::IMPORTED_FROM, database.database_imported_from.as_str()),
            ],
        )?;

        let schema = expect_single_related(service, &entity, types::DEPLOYED_DATABASE_SCHEMA).await?;
        assert_property(
            &schema,
            types::QUALIFIED_NAME,
            &types::deployed_schema_qualified_name(&database.qualified_name),
        )?;
        info!("Database {} verified", database.qualified_name);
        Ok(())
    }

    pub async fn upsert_relational_table(&self, conn: &mut FvtConnection) -> VerificationResult<()> {
        self.ensure_external_source(conn).await?;
        let submitted = self
            .data_stores
            .upsert_relational_table(conn.user_id(), &conn.client)
            .await?;
        let table = &submitted.descriptor;
        let service = &conn.repository_service;

        let entity =
            expect_single_entity(service, types::RELATIONAL_TABLE, &table.qualified_name).await?;
        assert_guid(&entity, &submitted.guid)?;
        assert_properties(
            &entity,
            &[
                (types::DISPLAY_NAME, table.display_name.as_str()),
                (types::DESCRIPTION, table.description.as_str()),
            ],
        )?;

        let schema_type =
            expect_single_related(service, &entity, types::RELATIONAL_DB_SCHEMA_TYPE).await?;
        let deployed =
            expect_single_related(service, &entity, types::DEPLOYED_DATABASE_SCHEMA).await?;
        let schema_type_name = schema_type
            .qualified_name()
            .ok_or_else(|| VerificationError::PropertyMismatch {
                type_name: schema_type.instance_type.type_def_name.clone(),
                guid: schema_type.guid.clone(),
                property: types::QUALIFIED_NAME.to_string(),
                expected: types::schema_type_qualified_name(
                    self.data_stores.table_database_qualified_name(),
                ),
                actual: None,
            })?;
        assert_property(
            &deployed,
            types::QUALIFIED_NAME,
            &types::schema_of_qualified_name(&schema_type_name),
        )?;
        let database = expect_single_related(service, &entity, types::DATABASE).await?;
        assert_property(
            &database,
            types::QUALIFIED_NAME,
            self.data_stores.table_database_qualified_name(),
        )?;

        if let Some(column) = table.first_column() {
            let entity =
                expect_single_entity(service, types::RELATIONAL_COLUMN, &column.qualified_name)
                    .await?;
            assert_properties(
                &entity,
                &[
                    (types::DISPLAY_NAME, column.display_name.as_str()),
                    (types::DESCRIPTION, column.description.as_str()),
                ],
            )?;
        }
        info!("Relational table {} verified", table.qualified_name);
        Ok(())
    }

    pub async fn upsert_data_file(&self, conn: &mut FvtConnection) -> VerificationResult<()> {
        self.ensure_external_source(conn).await?;
        let submitted = self
            .data_stores
            .upsert_data_file(conn.user_id(), &conn.client)
            .await?;
        let data_file = &submitted.descriptor;
        let service = &conn.repository_service;

        let entity = expect_single_entity(service, types::DATA_FILE, &data_file.qualified_name).await?;
        assert_guid(&entity, &submitted.guid)?;
        assert_properties(
            &entity,
            &[
                (types::NAME, data_file.display_name.as_str()),
                (types::QUALIFIED_NAME, data_file.qualified_name.as_str()),
                (types::DESCRIPTION, data_file.description.as_str()),
                (types::FILE_TYPE, data_file.file_type.as_str()),
            ],
        )?;

        let schema = expect_single_related(service, &entity, types::TABULAR_SCHEMA_TYPE).await?;
        assert_properties(
            &schema,
            &[
                (types::NAME, types::TABULAR_SCHEMA_NAME),
                (
                    types::QUALIFIED_NAME,
                    types::schema_type_qualified_name(&data_file.qualified_name).as_str(),
                ),
            ],
        )?;

        if let Some(column) = data_file.first_column() {
            let entity =
                expect_single_entity(service, types::TABULAR_COLUMN, &column.qualified_name).await?;
            assert_properties(
                &entity,
                &[
                    (types::DISPLAY_NAME, column.display_name.as_str()),
                    (types::DESCRIPTION, column.description.as_str()),
                ],
            )?;
        }
        info!("Data file {} verified", data_file.qualified_name);
        Ok(())
    }
}
