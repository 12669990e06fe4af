//! Job process setup
//!
//! Registers the external tool and builds a CSV to database job:
//!
//! ```text
//! csv column -> in-port attribute -> out-port attribute -> table column
//! ```
//!
//! one chain per CSV column, each link submitted as a lineage mapping.

use std::collections::BTreeMap;
use tracing::info;

use super::{Submitted, column_qualified_name, columns_of};
use crate::client::{ClientResult, DataEngineClient};
use crate::models::{
    DataFile, Database, PortImplementation, PortSchemaType, PortType, Process, RelationalTable,
    SoftwareServerCapability, chain_mappings,
};

const CSV_DATA_TYPE: &str = "string";
const TABLE_DATA_TYPE: &str = "varchar(255)";

/// Submits the external tool and the job process through a data engine client
#[derive(Debug, Clone)]
pub struct ProcessSetupService {
    engine_name: String,
    process_name: String,
    csv_path: String,
    database_qualified_name: String,
    table_name: String,
    csv_columns: Vec<String>,
}

impl Default for ProcessSetupService {
    fn default() -> Self {
        Self {
            engine_name: "fvt-data-engine".to_string(),
            process_name: "fvt-job".to_string(),
            csv_path: "/fvt/landing/customers.csv".to_string(),
            database_qualified_name: "(database)=fvt-warehouse".to_string(),
            table_name: "customers".to_string(),
            csv_columns: vec![
                "customer_id".to_string(),
                "first_name".to_string(),
                "last_name".to_string(),
            ],
        }
    }
}

impl ProcessSetupService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csv_columns(mut self, csv_columns: Vec<String>) -> Self {
        self.csv_columns = csv_columns;
        self
    }

    pub fn external_data_engine(&self) -> SoftwareServerCapability {
        SoftwareServerCapability {
            qualified_name: format!("(engine)={}", self.engine_name),
            name: self.engine_name.clone(),
            engine_type: "DataEngine".to_string(),
            engine_version: "1.0".to_string(),
            patch_level: "0".to_string(),
            source: "data-engine-fvt".to_string(),
            description: "External data engine registered by the FVT".to_string(),
        }
    }

    /// Register the external tool and use it as the client's external source
    pub async fn create_external_data_engine<C: DataEngineClient + ?Sized>(
        &self,
        user_id: &str,
        client: &mut C,
    ) -> ClientResult<Submitted<SoftwareServerCapability>> {
        let capability = self.external_data_engine();
        let guid = client.create_external_data_engine(user_id, &capability).await?;
        client.set_external_source_name(&capability.qualified_name);
        Ok(Submitted::new(guid, capability))
    }

    fn csv_qualified_name(&self) -> String {
        format!("(file)={}", self.csv_path)
    }

    fn table_qualified_name(&self) -> String {
        format!("{}::(table)={}", self.database_qualified_name, self.table_name)
    }

    fn port_qualified_name(&self, port: &str) -> String {
        format!("(process)={}::(port)={}", self.process_name, port)
    }

    pub fn csv_data_file(&self) -> DataFile {
        let qualified_name = self.csv_qualified_name();
        DataFile {
            columns: columns_of(&qualified_name, &self.csv_columns, CSV_DATA_TYPE),
            display_name: self
                .csv_path
                .rsplit('/')
                .next()
                .unwrap_or(&self.csv_path)
                .to_string(),
            description: "Landing file read by the FVT job".to_string(),
            file_type: "csv".to_string(),
            qualified_name,
        }
    }

    pub fn target_database(&self) -> Database {
        Database {
            qualified_name: self.database_qualified_name.clone(),
            display_name: "fvt-warehouse".to_string(),
            description: "Warehouse written by the FVT job".to_string(),
            database_type: "postgres".to_string(),
            database_version: "13.2".to_string(),
            database_instance: "fvt-instance".to_string(),
            database_imported_from: "fvt-catalog".to_string(),
        }
    }

    pub fn target_table(&self) -> RelationalTable {
        let qualified_name = self.table_qualified_name();
        RelationalTable {
            columns: columns_of(&qualified_name, &self.csv_columns, TABLE_DATA_TYPE),
            display_name: self.table_name.clone(),
            description: "Table written by the FVT job".to_string(),
            qualified_name,
        }
    }

    fn port(&self, name: &str, port_type: PortType, data_type: &str) -> PortImplementation {
        let qualified_name = self.port_qualified_name(name);
        let schema_name = format!("{}::schema", qualified_name);
        PortImplementation {
            display_name: name.to_string(),
            port_type,
            schema_type: PortSchemaType {
                attributes: columns_of(&qualified_name, &self.csv_columns, data_type),
                display_name: format!("{} schema", name),
                qualified_name: schema_name,
            },
            qualified_name,
        }
    }

    /// The job process, its ports and every lineage mapping of every chain
    pub fn job_process(&self) -> Process {
        let lineage_mappings = self
            .job_process_lineage_mappings_proxies_by_csv_column()
            .values()
            .flat_map(|chain| chain_mappings(chain))
            .collect();
        Process {
            qualified_name: format!("(process)={}", self.process_name),
            display_name: self.process_name.clone(),
            name: self.process_name.clone(),
            description: "Copies the landing CSV into the warehouse".to_string(),
            owner: "data-engine-fvt".to_string(),
            port_implementations: vec![
                self.port("read", PortType::InPort, CSV_DATA_TYPE),
                self.port("write", PortType::OutPort, TABLE_DATA_TYPE),
            ],
            lineage_mappings,
        }
    }

    /// Upsert the source file, the target table and the job process
    pub async fn create_job_process_with_content<C: DataEngineClient + ?Sized>(
        &self,
        user_id: &str,
        client: &C,
    ) -> ClientResult<Submitted<Process>> {
        client.upsert_data_file(user_id, &self.csv_data_file()).await?;
        client
            .upsert_database(user_id, &self.target_database())
            .await?;
        client
            .upsert_relational_table(user_id, &self.target_table(), &self.database_qualified_name)
            .await?;

        let process = self.job_process();
        let guid = client.create_or_update_process(user_id, &process).await?;
        info!(
            "Job process {} created as {} with {} lineage mappings",
            process.qualified_name,
            guid,
            process.lineage_mappings.len()
        );
        Ok(Submitted::new(guid, process))
    }

    /// Attribute chain per CSV column, ordered from file to table
    pub fn job_process_lineage_mappings_proxies_by_csv_column(
        &self,
    ) -> BTreeMap<String, Vec<String>> {
        let csv = self.csv_qualified_name();
        let read = self.port_qualified_name("read");
        let write = self.port_qualified_name("write");
        let table = self.table_qualified_name();

        self.csv_columns
            .iter()
            .map(|column| {
                let chain = [&csv, &read, &write, &table]
                    .iter()
                    .map(|parent| column_qualified_name(parent, column))
                    .collect();
                (column.clone(), chain)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chains_follow_the_job() {
        let setup = ProcessSetupService::new();
        let chains = setup.job_process_lineage_mappings_proxies_by_csv_column();
        assert_eq!(chains.len(), 3);
        let chain = &chains["first_name"];
        assert_eq!(
            chain,
            &vec![
                "(file)=/fvt/landing/customers.csv::(column)=first_name".to_string(),
                "(process)=fvt-job::(port)=read::(column)=first_name".to_string(),
                "(process)=fvt-job::(port)=write::(column)=first_name".to_string(),
                "(database)=fvt-warehouse::(table)=customers::(column)=first_name".to_string(),
            ]
        );
    }

    #[test]
    fn test_process_carries_every_link() {
        let setup = ProcessSetupService::new()
            .with_csv_columns(vec!["a".to_string(), "b".to_string()]);
        let process = setup.job_process();
        assert_eq!(process.port_implementations.len(), 2);
        assert_eq!(process.port_implementations[0].port_type, PortType::InPort);
        assert_eq!(process.port_implementations[1].schema_type.attributes.len(), 2);
        // two columns, three links each
        assert_eq!(process.lineage_mappings.len(), 6);
    }
}
