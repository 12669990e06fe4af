//! Suite configuration file support
//!
//! Handles parsing of `.data-engine-fvt.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::connection::ConnectionDetails;
use super::{FvtError, FvtResult};
use crate::repository::ServerVariant;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".data-engine-fvt.toml";

/// Default server platform URL
pub const DEFAULT_PLATFORM_URL: &str = "https://localhost:10443";

/// Default user the suite runs as
pub const DEFAULT_USER_ID: &str = "garygeeke";

/// Environment variable for the server platform URL
pub const ENV_PLATFORM_URL: &str = "DATA_ENGINE_FVT_PLATFORM_URL";

/// Environment variable for the user id
pub const ENV_USER_ID: &str = "DATA_ENGINE_FVT_USER_ID";

/// Environment variable for a comma-separated list of server variants
pub const ENV_SERVERS: &str = "DATA_ENGINE_FVT_SERVERS";

/// Platform configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSection {
    /// Server platform URL (http or https)
    #[serde(default = "default_platform_url")]
    pub url: String,

    /// User the scenarios run as
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Server variants to run against
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Users the data engine admits; empty admits everyone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorized_users: Vec<String>,
}

fn default_platform_url() -> String {
    DEFAULT_PLATFORM_URL.to_string()
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_servers() -> Vec<String> {
    ServerVariant::ALL
        .iter()
        .map(|variant| variant.server_name().to_string())
        .collect()
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            url: default_platform_url(),
            user_id: default_user_id(),
            servers: default_servers(),
            authorized_users: Vec::new(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.data-engine-fvt.toml` configuration file format. When
/// explicit `[[connections]]` are listed they replace the platform cross
/// product.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FvtConfig {
    #[serde(default)]
    pub platform: PlatformSection,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<ConnectionDetails>,
}

impl FvtConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a directory
    ///
    /// Looks for `.data-engine-fvt.toml` in the directory.
    /// Falls back to defaults if not found.
    pub fn load(dir: &Path) -> FvtResult<Self> {
        Self::load_with_overrides(dir, |key| std::env::var(key).ok())
    }

    /// Load configuration from a directory, taking overrides from `lookup`
    pub fn load_with_overrides<F>(dir: &Path, lookup: F) -> FvtResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(lookup);
        Ok(config)
    }

    /// Load configuration from an explicit file, without environment overrides
    pub fn load_file(path: &Path) -> FvtResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FvtError::IoError(format!("Failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> FvtResult<Self> {
        toml::from_str(content)
            .map_err(|e| FvtError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> FvtResult<()> {
        let content = self.to_toml()?;
        std::fs::write(dir.join(CONFIG_FILENAME), content)
            .map_err(|e| FvtError::IoError(format!("Failed to write config: {}", e)))
    }

    pub fn to_toml(&self) -> FvtResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            FvtError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_PLATFORM_URL) {
            self.platform.url = url;
        }

        if let Some(user_id) = lookup(ENV_USER_ID) {
            self.platform.user_id = user_id;
        }

        if let Some(servers) = lookup(ENV_SERVERS) {
            let servers: Vec<String> = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !servers.is_empty() {
                self.platform.servers = servers;
            }
        }
    }

    /// Connection tuples this configuration describes
    pub fn connection_details(&self) -> Vec<ConnectionDetails> {
        if !self.connections.is_empty() {
            return self.connections.clone();
        }
        self.platform
            .servers
            .iter()
            .map(|server| {
                ConnectionDetails::new(&self.platform.url, server, &self.platform.user_id)
            })
            .collect()
    }

    /// Check every connection tuple without connecting
    pub fn validate(&self) -> FvtResult<()> {
        let connections = self.connection_details();
        if connections.is_empty() {
            return Err(FvtError::ConfigError(
                "No connections configured".to_string(),
            ));
        }
        for details in &connections {
            details.validate()?;
        }
        Ok(())
    }

    /// Check if configuration exists in a directory
    pub fn exists(dir: &Path) -> bool {
        dir.join(CONFIG_FILENAME).exists()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Data Engine FVT Configuration
# This file configures the connections the functional verification suite runs against.

[platform]
# Server platform URL (http or https)
url = "https://localhost:10443"

# User the scenarios run as
user_id = "garygeeke"

# Server variants: "serverinmem" and/or "servergraph"
servers = ["serverinmem", "servergraph"]

# Users the data engine admits (empty admits everyone)
# authorized_users = ["garygeeke"]

# Explicit connections replace the platform cross product
# [[connections]]
# server_platform_url = "https://localhost:10443"
# server_name = "serverinmem"
# user_id = "garygeeke"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = FvtConfig::new();
        let connections = config.connection_details();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].server_platform_url, DEFAULT_PLATFORM_URL);
        assert_eq!(connections[0].server_name, "serverinmem");
        assert_eq!(connections[1].server_name, "servergraph");
        assert!(connections.iter().all(|c| c.user_id == DEFAULT_USER_ID));
    }

    #[test]
    fn test_parse_explicit_connections() {
        let toml = r#"
[platform]
url = "https://ignored:9443"

[[connections]]
server_platform_url = "http://platform:9443"
server_name = "servergraph"
user_id = "erinoverview"
"#;
        let config = FvtConfig::parse(toml).unwrap();
        let connections = config.connection_details();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].server_platform_url, "http://platform:9443");
        assert_eq!(connections[0].user_id, "erinoverview");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_PLATFORM_URL, "https://fvt:10443"),
            (ENV_USER_ID, "calliequartile"),
            (ENV_SERVERS, " servergraph , "),
        ]
        .into_iter()
        .collect();

        let mut config = FvtConfig::new();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        let connections = config.connection_details();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].server_platform_url, "https://fvt:10443");
        assert_eq!(connections[0].server_name, "servergraph");
        assert_eq!(connections[0].user_id, "calliequartile");
    }

    #[test]
    fn test_validate() {
        assert!(FvtConfig::new().validate().is_ok());

        let mut config = FvtConfig::new();
        config.platform.url = "ftp://localhost".to_string();
        assert!(matches!(
            config.validate(),
            Err(FvtError::InvalidEndpoint(_))
        ));

        let mut config = FvtConfig::new();
        config.platform.servers = vec!["serverdb".to_string()];
        assert!(matches!(config.validate(), Err(FvtError::UnknownVariant(_))));

        let mut config = FvtConfig::new();
        config.platform.servers.clear();
        assert!(matches!(config.validate(), Err(FvtError::ConfigError(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = FvtConfig::new();
        config.platform.servers = vec!["servergraph".to_string()];

        config.save(dir.path()).unwrap();
        assert!(FvtConfig::exists(dir.path()));

        let loaded = FvtConfig::load_file(&dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(loaded.platform.servers, vec!["servergraph".to_string()]);
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = FvtConfig::parse(sample_config()).unwrap();
        assert_eq!(config.connection_details().len(), 2);
        assert!(config.validate().is_ok());
    }
}
