//! Data Engine FVT - functional verification harness for metadata data engines
//!
//! Provides:
//! - Descriptor and repository instance models
//! - A data engine client seam with an in-process engine
//! - In-memory and graph metadata repository backends
//! - Setup invokers that submit fixtures through the client
//! - A verification harness that reads the repository back
//! - The scenario suite, its configuration and run reports

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod fvt;
pub mod models;
pub mod repository;
pub mod setup;
pub mod verification;

// Re-export commonly used types
pub use client::{ClientError, ClientResult, DataEngineClient, LocalDataEngine};
pub use fvt::{
    ConnectionDetails, DataEngineFvt, FvtConfig, FvtError, FvtReport, FvtResult,
    PlatformConnectionProvider, Scenario, run_it, run_suite,
};
pub use models::{EntityDetail, EntityProxy, InstanceProperties, Relationship};
pub use repository::{
    GraphRepository, InMemoryRepository, MetadataCollection, MetadataStore, RepositoryError,
    RepositoryQuery, RepositoryResult, RepositoryService, ServerVariant,
};
pub use setup::{DataStoreSetupService, ProcessSetupService, Submitted};
pub use verification::{VerificationError, VerificationResult};
