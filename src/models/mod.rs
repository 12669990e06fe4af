//! Models module
//!
//! Two families of structures live here:
//! - descriptors submitted by the setup invokers (capability, data stores, processes)
//! - repository instances read back by the verification harness (entities, relationships)

pub mod capability;
pub mod column;
pub mod data_store;
pub mod entity;
pub mod process;
pub mod properties;
pub mod relationship;
pub mod types;

pub use capability::SoftwareServerCapability;
pub use column::Column;
pub use data_store::{DataFile, Database, RelationalTable};
pub use entity::{EntityDetail, EntityProxy};
pub use process::{
    LineageMapping, PortImplementation, PortSchemaType, PortType, Process, chain_mappings,
};
pub use properties::{InstanceProperties, InstanceType, PropertyValue};
pub use relationship::Relationship;
pub use types::TypeDef;
