//! Connection tuples and the handles built from them

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::config::{DEFAULT_PLATFORM_URL, DEFAULT_USER_ID, FvtConfig};
use super::{FvtError, FvtResult};
use crate::client::LocalDataEngine;
use crate::repository::{MetadataCollection, RepositoryService, ServerVariant};

/// One (platform URL, server variant, user) tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub server_platform_url: String,
    pub server_name: String,
    pub user_id: String,
}

impl ConnectionDetails {
    pub fn new(
        server_platform_url: impl Into<String>,
        server_name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            server_platform_url: server_platform_url.into(),
            server_name: server_name.into(),
            user_id: user_id.into(),
        }
    }

    /// Backend variant named by `server_name`
    pub fn variant(&self) -> FvtResult<ServerVariant> {
        self.server_name.parse().map_err(FvtError::UnknownVariant)
    }

    pub fn validate(&self) -> FvtResult<ServerVariant> {
        let host = self
            .server_platform_url
            .strip_prefix("https://")
            .or_else(|| self.server_platform_url.strip_prefix("http://"));
        match host {
            Some(host) if !host.trim_matches('/').is_empty() => {}
            _ => {
                return Err(FvtError::InvalidEndpoint(format!(
                    "{} (expected an http:// or https:// URL)",
                    self.server_platform_url
                )));
            }
        }
        if self.user_id.trim().is_empty() {
            return Err(FvtError::ConfigError(format!(
                "Empty user id for {} on {}",
                self.server_name, self.server_platform_url
            )));
        }
        self.variant()
    }
}

impl std::fmt::Display for ConnectionDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} on {} as {}",
            self.server_name, self.server_platform_url, self.user_id
        )
    }
}

/// Client and repository handles for one connection tuple
pub struct FvtConnection {
    pub details: ConnectionDetails,
    pub variant: ServerVariant,
    pub client: LocalDataEngine<dyn MetadataCollection>,
    pub repository_service: RepositoryService<dyn MetadataCollection>,
    repository: Arc<dyn MetadataCollection>,
}

impl FvtConnection {
    pub fn user_id(&self) -> &str {
        &self.details.user_id
    }

    /// Direct handle on the backing repository
    pub fn repository(&self) -> &Arc<dyn MetadataCollection> {
        &self.repository
    }
}

/// Supplies the connection tuples a suite runs against
#[derive(Debug, Clone)]
pub struct PlatformConnectionProvider {
    connections: Vec<ConnectionDetails>,
    authorized_users: Vec<String>,
}

impl Default for PlatformConnectionProvider {
    fn default() -> Self {
        Self::new(
            ServerVariant::ALL
                .iter()
                .map(|variant| {
                    ConnectionDetails::new(
                        DEFAULT_PLATFORM_URL,
                        variant.server_name(),
                        DEFAULT_USER_ID,
                    )
                })
                .collect(),
        )
    }
}

impl PlatformConnectionProvider {
    pub fn new(connections: Vec<ConnectionDetails>) -> Self {
        Self {
            connections,
            authorized_users: Vec::new(),
        }
    }

    pub fn from_config(config: &FvtConfig) -> Self {
        Self {
            connections: config.connection_details(),
            authorized_users: config.platform.authorized_users.clone(),
        }
    }

    pub fn with_authorized_users(mut self, users: Vec<String>) -> Self {
        self.authorized_users = users;
        self
    }

    pub fn connection_details(&self) -> &[ConnectionDetails] {
        &self.connections
    }

    /// Build a fresh client and repository service for one tuple
    pub fn connect(&self, details: &ConnectionDetails) -> FvtResult<FvtConnection> {
        let variant = details.validate()?;
        let repository = variant.create_repository();
        let client = LocalDataEngine::new(variant.server_name(), Arc::clone(&repository))
            .with_authorized_users(self.authorized_users.clone());
        let repository_service = RepositoryService::new(Arc::clone(&repository));
        debug!("Connected to {}", details);

        Ok(FvtConnection {
            details: details.clone(),
            variant,
            client,
            repository_service,
            repository,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuples() {
        let provider = PlatformConnectionProvider::default();
        let names: Vec<&str> = provider
            .connection_details()
            .iter()
            .map(|c| c.server_name.as_str())
            .collect();
        assert_eq!(names, vec!["serverinmem", "servergraph"]);
    }

    #[test]
    fn test_validate_rejects_bad_tuples() {
        let ok = ConnectionDetails::new("http://localhost:9443", "servergraph", "garygeeke");
        assert_eq!(ok.validate().unwrap(), ServerVariant::Graph);

        for url in ["localhost:10443", "ftp://localhost", "https://", ""] {
            let details = ConnectionDetails::new(url, "serverinmem", "garygeeke");
            assert!(
                matches!(details.validate(), Err(FvtError::InvalidEndpoint(_))),
                "{url} should be rejected"
            );
        }

        let details = ConnectionDetails::new(DEFAULT_PLATFORM_URL, "serverdb", "garygeeke");
        assert!(matches!(
            details.validate(),
            Err(FvtError::UnknownVariant(_))
        ));

        let details = ConnectionDetails::new(DEFAULT_PLATFORM_URL, "serverinmem", " ");
        assert!(matches!(details.validate(), Err(FvtError::ConfigError(_))));
    }

    #[test]
    fn test_connections_are_independent() {
        let provider = PlatformConnectionProvider::default();
        let details = &provider.connection_details()[0];
        let first = provider.connect(details).unwrap();
        let second = provider.connect(details).unwrap();
        assert!(!Arc::ptr_eq(first.repository(), second.repository()));
        assert_eq!(first.client.server_name(), "serverinmem");
    }
}
