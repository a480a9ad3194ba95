/*
Copyright 2024, Zep Software, Inc.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Graph connection factory

use std::sync::Arc;
use tracing::info;

use crate::database::{create_database, DatabaseConfig, DatabaseResult, DatabaseType, GraphDatabase};
use crate::properties::GraphProperties;

/// The connection variant selected from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Embedded,
    Remote,
    RemoteCredentialed,
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionMode::Embedded => write!(f, "embedded"),
            ConnectionMode::Remote => write!(f, "remote"),
            ConnectionMode::RemoteCredentialed => write!(f, "remote-credentialed"),
        }
    }
}

/// Produces database handles for one configured target
///
/// Construction performs no I/O; the store is opened or the server dialled
/// on [`GraphConnectionFactory::connect`].
#[derive(Debug, Clone)]
pub struct GraphConnectionFactory {
    config: DatabaseConfig,
}

impl GraphConnectionFactory {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn from_properties(properties: &GraphProperties) -> Self {
        Self::new(properties.database_config())
    }

    pub fn mode(&self) -> ConnectionMode {
        match self.config.database_type {
            DatabaseType::Embedded => ConnectionMode::Embedded,
            DatabaseType::Neo4j if self.config.has_credentials() => ConnectionMode::RemoteCredentialed,
            DatabaseType::Neo4j => ConnectionMode::Remote,
        }
    }

    /// Storage path in embedded mode, endpoint otherwise
    pub fn target(&self) -> &str {
        &self.config.uri
    }

    pub fn username(&self) -> Option<&str> {
        self.config.username.as_deref()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub async fn connect(&self) -> DatabaseResult<Arc<dyn GraphDatabase>> {
        info!(mode = %self.mode(), target = %self.target(), "Opening graph connection");
        create_database(self.config.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_follows_properties() {
        let embedded = GraphConnectionFactory::from_properties(&GraphProperties::default());
        assert_eq!(embedded.mode(), ConnectionMode::Embedded);
        assert_eq!(embedded.target(), "./test.db");

        let mut remote = GraphProperties::default();
        remote.embedded = false;
        let anonymous = GraphConnectionFactory::from_properties(&remote);
        assert_eq!(anonymous.mode(), ConnectionMode::Remote);
        assert_eq!(anonymous.target(), "localhost:7474/data/db");

        remote.username = Some("alice".to_string());
        let credentialed = remote.with_password("secret");
        let factory = GraphConnectionFactory::from_properties(&credentialed);
        assert_eq!(factory.mode(), ConnectionMode::RemoteCredentialed);
        assert_eq!(factory.username(), Some("alice"));
    }

    #[test]
    fn test_embedded_connect_opens_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db").to_string_lossy().into_owned();
        let factory = GraphConnectionFactory::new(DatabaseConfig::embedded(path));

        let db = tokio_test::block_on(factory.connect()).unwrap();
        assert!(tokio_test::block_on(db.health_check()).unwrap());
    }
}
