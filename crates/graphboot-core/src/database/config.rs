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

//! Database configuration types

use zeroize::Zeroizing;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Neo4j,
    Embedded,
}

/// Database configuration
///
/// For [`DatabaseType::Embedded`] the `uri` is the filesystem path of the store.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub database_type: DatabaseType,
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
}

impl DatabaseConfig {
    /// Create a credentialed Neo4j configuration
    pub fn neo4j(uri: String, username: String, password: String) -> Self {
        Self {
            database_type: DatabaseType::Neo4j,
            uri,
            username: Some(username),
            password: Some(Zeroizing::new(password)),
        }
    }

    /// Create an anonymous Neo4j configuration
    pub fn neo4j_anonymous(uri: String) -> Self {
        Self {
            database_type: DatabaseType::Neo4j,
            uri,
            username: None,
            password: None,
        }
    }

    /// Create an embedded store configuration
    pub fn embedded(path: String) -> Self {
        Self {
            database_type: DatabaseType::Embedded,
            uri: path,
            username: None,
            password: None,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("database_type", &self.database_type)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::embedded("./test.db".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_has_no_credentials() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_type, DatabaseType::Embedded);
        assert_eq!(config.uri, "./test.db");
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DatabaseConfig::neo4j(
            "localhost:7687".to_string(),
            "neo4j".to_string(),
            "hunter2".to_string(),
        );
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("********"));
        assert!(config.has_credentials());
    }
}
