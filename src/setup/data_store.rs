//! Data store setup: databases, relational tables and data files

use tracing::debug;

use super::{Submitted, columns_of};
use crate::client::{ClientResult, DataEngineClient};
use crate::models::{DataFile, Database, RelationalTable};

/// Submits data store descriptors through a data engine client
#[derive(Debug, Clone)]
pub struct DataStoreSetupService {
    database_name: String,
    database_qualified_name: String,
    table_database_qualified_name: String,
    table_name: String,
    table_columns: Vec<String>,
    data_file_path: String,
    data_file_columns: Vec<String>,
}

impl Default for DataStoreSetupService {
    fn default() -> Self {
        Self {
            database_name: "db1".to_string(),
            database_qualified_name: "db1-qn".to_string(),
            table_database_qualified_name: "(database)=fvt-sales".to_string(),
            table_name: "orders".to_string(),
            table_columns: vec![
                "order_id".to_string(),
                "customer_id".to_string(),
                "amount".to_string(),
            ],
            data_file_path: "/fvt/exports/orders.csv".to_string(),
            data_file_columns: vec![
                "order_id".to_string(),
                "order_date".to_string(),
                "amount".to_string(),
            ],
        }
    }
}

impl DataStoreSetupService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the display and qualified name of the database fixture
    pub fn with_database(
        mut self,
        name: impl Into<String>,
        qualified_name: impl Into<String>,
    ) -> Self {
        self.database_name = name.into();
        self.database_qualified_name = qualified_name.into();
        self
    }

    /// Qualified name of the database the relational table is upserted into
    pub fn table_database_qualified_name(&self) -> &str {
        &self.table_database_qualified_name
    }

    pub fn database(&self) -> Database {
        database_fixture(&self.database_qualified_name, &self.database_name)
    }

    /// The database holding the relational table fixture
    pub fn table_database(&self) -> Database {
        let name = self
            .table_database_qualified_name
            .rsplit('=')
            .next()
            .unwrap_or(&self.table_database_qualified_name);
        database_fixture(&self.table_database_qualified_name, name)
    }

    pub fn relational_table(&self) -> RelationalTable {
        let qualified_name = format!(
            "{}::(table)={}",
            self.table_database_qualified_name, self.table_name
        );
        RelationalTable {
            columns: columns_of(&qualified_name, &self.table_columns, "varchar(255)"),
            display_name: self.table_name.clone(),
            description: format!("{} table used by the data engine FVT", self.table_name),
            qualified_name,
        }
    }

    pub fn data_file(&self) -> DataFile {
        let qualified_name = format!("(file)={}", self.data_file_path);
        let display_name = self
            .data_file_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.data_file_path)
            .to_string();
        DataFile {
            columns: columns_of(&qualified_name, &self.data_file_columns, "string"),
            description: format!("{} data file used by the data engine FVT", display_name),
            display_name,
            file_type: "csv".to_string(),
            qualified_name,
        }
    }

    pub async fn upsert_database<C: DataEngineClient + ?Sized>(
        &self,
        user_id: &str,
        client: &C,
    ) -> ClientResult<Submitted<Database>> {
        let database = self.database();
        let guid = client.upsert_database(user_id, &database).await?;
        debug!("Database {} upserted as {}", database.qualified_name, guid);
        Ok(Submitted::new(guid, database))
    }

    /// Upsert the table's database, then the table into it
    pub async fn upsert_relational_table<C: DataEngineClient + ?Sized>(
        &self,
        user_id: &str,
        client: &C,
    ) -> ClientResult<Submitted<RelationalTable>> {
        client.upsert_database(user_id, &self.table_database()).await?;
        let table = self.relational_table();
        let guid = client
            .upsert_relational_table(user_id, &table, &self.table_database_qualified_name)
            .await?;
        debug!("Relational table {} upserted as {}", table.qualified_name, guid);
        Ok(Submitted::new(guid, table))
    }

    pub async fn upsert_data_file<C: DataEngineClient + ?Sized>(
        &self,
        user_id: &str,
        client: &C,
    ) -> ClientResult<Submitted<DataFile>> {
        let data_file = self.data_file();
        let guid = client.upsert_data_file(user_id, &data_file).await?;
        debug!("Data file {} upserted as {}", data_file.qualified_name, guid);
        Ok(Submitted::new(guid, data_file))
    }
}

fn database_fixture(qualified_name: &str, name: &str) -> Database {
    Database {
        qualified_name: qualified_name.to_string(),
        display_name: name.to_string(),
        description: format!("{} database used by the data engine FVT", name),
        database_type: "postgres".to_string(),
        database_version: "13.2".to_string(),
        database_instance: "fvt-instance".to_string(),
        database_imported_from: "fvt-catalog".to_string(),
    }
}
