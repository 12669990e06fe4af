//! Verification harness
//!
//! Compares what setup invokers submitted with what the repository holds:
//! - single-entity lookup by type and qualified name, matched against the
//!   GUID the server assigned
//! - property-by-property comparison
//! - related-entity traversal with derived-name checks
//! - lineage chain checks
//!
//! Every check is fail-fast: the first violated expectation is returned as a
//! [`VerificationError`] and nothing is retried.

use crate::client::ClientError;
use crate::repository::RepositoryError;

pub mod assertions;
pub mod lineage;

pub use assertions::{
    assert_guid, assert_properties, assert_property, expect_single_entity, expect_single_related,
};
pub use lineage::{verify_column_lineages, verify_lineage_chain};

/// First violated expectation of a verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// Zero results where at least one was expected
    #[error("No {type_name} entity found for {value}")]
    NotFound { type_name: String, value: String },

    /// Exactly one result was expected
    #[error("Expected exactly one {type_name} for {context} but found {count}")]
    Cardinality {
        type_name: String,
        context: String,
        count: usize,
    },

    #[error("Property {property} of {type_name} {guid}: expected {expected:?}, found {actual:?}")]
    PropertyMismatch {
        type_name: String,
        guid: String,
        property: String,
        expected: String,
        actual: Option<String>,
    },

    /// The entity found by qualified name is not the one the server reported
    #[error("{type_name} {qualified_name}: server assigned {expected}, repository holds {actual}")]
    GuidMismatch {
        type_name: String,
        qualified_name: String,
        expected: String,
        actual: String,
    },

    #[error("Lineage mappings of {attribute}: expected {expected:?}, found {actual:?}")]
    LineageMismatch {
        attribute: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result type for verification steps
pub type VerificationResult<T> = Result<T, VerificationError>;
