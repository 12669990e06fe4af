//! External tool capability descriptor

use serde::{Deserialize, Serialize};

/// Software server capability registered by an external data engine
///
/// Its qualified name is used as the external source name for every
/// subsequent upsert made by the same client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoftwareServerCapability {
    pub qualified_name: String,
    pub name: String,
    /// Stored as the `type` property
    pub engine_type: String,
    /// Stored as the `version` property
    pub engine_version: String,
    #[serde(default)]
    pub patch_level: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
}
