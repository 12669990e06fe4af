//! Data engine client interface
//!
//! The client is the only way setup invokers submit metadata. Its error
//! taxonomy mirrors the service's: parameter validation, authorization,
//! property server and connector failures, plus the repository-level errors
//! surfaced through the service.

use async_trait::async_trait;

use crate::models::{
    DataFile, Database, LineageMapping, Process, RelationalTable, SoftwareServerCapability,
};
use crate::repository::RepositoryError;

pub mod local;

pub use local::LocalDataEngine;

/// Error type for data engine client operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("User not authorized: {0}")]
    UserNotAuthorized(String),

    #[error("Property server error: {0}")]
    PropertyServer(String),

    #[error("Connector checked error: {0}")]
    ConnectorChecked(String),

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

impl From<RepositoryError> for ClientError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InvalidParameter(msg) => ClientError::InvalidParameter(msg),
            RepositoryError::UserNotAuthorized(msg) => ClientError::UserNotAuthorized(msg),
            RepositoryError::FunctionNotSupported(msg) => ClientError::FunctionNotSupported(msg),
            RepositoryError::TypeError(msg) => ClientError::TypeError(msg),
            RepositoryError::PropertyError(msg) => ClientError::PropertyError(msg),
            RepositoryError::PagingError(msg) => ClientError::PagingError(msg),
            RepositoryError::RepositoryError(msg) => ClientError::RepositoryError(msg),
            RepositoryError::EntityNotKnown(msg) => ClientError::EntityNotKnown(msg),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Client for the data engine service
///
/// Every operation returns the GUID of the primary entity it created or
/// updated. All operations except [`create_external_data_engine`] require the
/// external source name to be set to a registered capability first.
///
/// [`create_external_data_engine`]: DataEngineClient::create_external_data_engine
#[async_trait]
pub trait DataEngineClient: Send + Sync {
    /// Qualified name of the capability on whose behalf metadata is submitted
    fn external_source_name(&self) -> Option<&str>;

    fn set_external_source_name(&mut self, external_source_name: &str);

    /// Register the external tool
    async fn create_external_data_engine(
        &self,
        user_id: &str,
        capability: &SoftwareServerCapability,
    ) -> ClientResult<String>;

    async fn upsert_database(&self, user_id: &str, database: &Database) -> ClientResult<String>;

    /// Upsert a table, with its columns, into the database with the given qualified name
    async fn upsert_relational_table(
        &self,
        user_id: &str,
        table: &RelationalTable,
        database_qualified_name: &str,
    ) -> ClientResult<String>;

    async fn upsert_data_file(&self, user_id: &str, data_file: &DataFile) -> ClientResult<String>;

    /// Create or update a process with its ports, port schemas and lineage mappings
    async fn create_or_update_process(
        &self,
        user_id: &str,
        process: &Process,
    ) -> ClientResult<String>;

    async fn add_lineage_mappings(
        &self,
        user_id: &str,
        lineage_mappings: &[LineageMapping],
    ) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_keep_their_category() {
        assert_eq!(
            ClientError::from(RepositoryError::EntityNotKnown("x".into())),
            ClientError::EntityNotKnown("x".into())
        );
        assert_eq!(
            ClientError::from(RepositoryError::PagingError("p".into())),
            ClientError::PagingError("p".into())
        );
    }
}
