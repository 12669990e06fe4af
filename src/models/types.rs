//! Open metadata type registry
//!
//! Entity and relationship type definitions used by the data engine, the
//! property names the harness reads, and the derived-name conventions the
//! engine applies to schema containers.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a type describes entities or relationships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeDefCategory {
    Entity,
    Relationship,
}

/// Reference to an open metadata type (GUID + name)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TypeDef {
    pub guid: &'static str,
    pub name: &'static str,
    pub category: TypeDefCategory,
}

impl TypeDef {
    const fn entity(guid: &'static str, name: &'static str) -> Self {
        Self {
            guid,
            name,
            category: TypeDefCategory::Entity,
        }
    }

    const fn relationship(guid: &'static str, name: &'static str) -> Self {
        Self {
            guid,
            name,
            category: TypeDefCategory::Relationship,
        }
    }
}

// Entity types
pub const SOFTWARE_SERVER_CAPABILITY: TypeDef = TypeDef::entity(
    "fe30a033-8f86-4d17-8986-e6166fa24177",
    "SoftwareServerCapability",
);
pub const DATABASE: TypeDef = TypeDef::entity("0921c83f-b2db-4086-a52c-0d10e52ca078", "Database");
pub const DATA_FILE: TypeDef = TypeDef::entity("10752b4a-4b5d-4519-9eae-fdd6d162122f", "DataFile");
pub const TABULAR_COLUMN: TypeDef =
    TypeDef::entity("d81a0425-4e9b-4f31-bc1c-e18c3566da10", "TabularColumn");
pub const RELATIONAL_TABLE: TypeDef =
    TypeDef::entity("ce7e72b8-396a-4013-8688-f9d973067425", "RelationalTable");
pub const RELATIONAL_COLUMN: TypeDef =
    TypeDef::entity("aa8d5470-6dbc-4648-9e2f-045e5df9d2f9", "RelationalColumn");
pub const RELATIONAL_DB_SCHEMA_TYPE: TypeDef = TypeDef::entity(
    "f20f5f45-1afb-41c1-9a09-34d8812626a4",
    "RelationalDBSchemaType",
);
pub const DEPLOYED_DATABASE_SCHEMA: TypeDef = TypeDef::entity(
    "eab811ec-556a-45f1-9091-bc7ac8face0f",
    "DeployedDatabaseSchema",
);
pub const TABULAR_SCHEMA_TYPE: TypeDef =
    TypeDef::entity("248975ec-8019-4b8a-9caf-084c8b724233", "TabularSchemaType");
pub const PROCESS: TypeDef = TypeDef::entity("d8f33bd7-afa9-4a11-a8c7-07dcec83c050", "Process");
pub const PORT_IMPLEMENTATION: TypeDef =
    TypeDef::entity("ADbbdF06-a6A3-4D5F-7fA3-DB4Cb0eDeC0E", "PortImplementation");

// Relationship types
pub const DATA_CONTENT_FOR_DATA_SET: TypeDef = TypeDef::relationship(
    "b827683c-2924-4df3-a92d-7be1888e23c0",
    "DataContentForDataSet",
);
pub const ASSET_SCHEMA_TYPE: TypeDef =
    TypeDef::relationship("815b004d-73c6-4728-9dd9-536f4fe803cd", "AssetSchemaType");
pub const ATTRIBUTE_FOR_SCHEMA: TypeDef =
    TypeDef::relationship("86b176a2-015c-44a6-8106-54d5d69ba661", "AttributeForSchema");
pub const NESTED_SCHEMA_ATTRIBUTE: TypeDef = TypeDef::relationship(
    "0ffb9d87-7074-45da-a9b0-ae0859611133",
    "NestedSchemaAttribute",
);
pub const PROCESS_PORT: TypeDef =
    TypeDef::relationship("fB4E00CD-10a7-DF8C-4B8b-0A6d4dca7C34", "ProcessPort");
pub const PORT_SCHEMA: TypeDef =
    TypeDef::relationship("B216fA00-8281-F9CC-9911-Ae6377f2b457", "PortSchema");
pub const LINEAGE_MAPPING: TypeDef =
    TypeDef::relationship("a5991bB2-660D-A3a1-2955-fAcDA2d5F4Ff", "LineageMapping");

static TYPE_REGISTRY: Lazy<HashMap<&'static str, TypeDef>> = Lazy::new(|| {
    [
        SOFTWARE_SERVER_CAPABILITY,
        DATABASE,
        DATA_FILE,
        TABULAR_COLUMN,
        RELATIONAL_TABLE,
        RELATIONAL_COLUMN,
        RELATIONAL_DB_SCHEMA_TYPE,
        DEPLOYED_DATABASE_SCHEMA,
        TABULAR_SCHEMA_TYPE,
        PROCESS,
        PORT_IMPLEMENTATION,
        DATA_CONTENT_FOR_DATA_SET,
        ASSET_SCHEMA_TYPE,
        ATTRIBUTE_FOR_SCHEMA,
        NESTED_SCHEMA_ATTRIBUTE,
        PROCESS_PORT,
        PORT_SCHEMA,
        LINEAGE_MAPPING,
    ]
    .into_iter()
    .map(|def| (def.guid, def))
    .collect()
});

/// Look up a known type definition by its GUID
pub fn type_def_by_guid(guid: &str) -> Option<TypeDef> {
    TYPE_REGISTRY.get(guid).copied()
}

/// Whether relationships of this type describe structure (containment,
/// schema attachment) rather than data flow.
pub fn is_structural(relationship_type_guid: &str) -> bool {
    relationship_type_guid != LINEAGE_MAPPING.guid
}

// Property names
pub const DESCRIPTION: &str = "description";
pub const NAME: &str = "name";
pub const TYPE: &str = "type";
pub const VERSION: &str = "version";
pub const PATCH_LEVEL: &str = "patchLevel";
pub const QUALIFIED_NAME: &str = "qualifiedName";
pub const DISPLAY_NAME: &str = "displayName";
pub const SOURCE: &str = "source";
pub const FILE_TYPE: &str = "fileType";
pub const DEPLOYED_IMPLEMENTATION_TYPE: &str = "deployedImplementationType";
pub const DATABASE_VERSION: &str = "databaseVersion";
pub const INSTANCE: &str = "instance";
pub const IMPORTED_FROM: &str = "importedFrom";
pub const POSITION: &str = "position";
pub const DATA_TYPE: &str = "dataType";
pub const OWNER: &str = "owner";
pub const PORT_TYPE: &str = "portType";

// Derived-name conventions
pub const DEPLOYED_SCHEMA_SUFFIX: &str = ":schema";
pub const SCHEMA_TYPE_SUFFIX: &str = "::schema";
pub const SCHEMA_OF_PREFIX: &str = "SchemaOf:";
pub const TABULAR_SCHEMA_NAME: &str = "Schema";

/// Qualified name of the deployed schema owned by a database
pub fn deployed_schema_qualified_name(database_qualified_name: &str) -> String {
    format!("{database_qualified_name}{DEPLOYED_SCHEMA_SUFFIX}")
}

/// Qualified name of the schema type attached to a parent asset or port
pub fn schema_type_qualified_name(parent_qualified_name: &str) -> String {
    format!("{parent_qualified_name}{SCHEMA_TYPE_SUFFIX}")
}

/// Qualified name of the deployed schema derived from a relational schema type
pub fn schema_of_qualified_name(schema_type_qualified_name: &str) -> String {
    format!("{SCHEMA_OF_PREFIX}{schema_type_qualified_name}")
}
