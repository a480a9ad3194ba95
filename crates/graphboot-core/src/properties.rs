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

//! Property sources and the bound graph configuration record

use std::path::Path;
use config::{Config, ConfigError, Environment, File, Source};
use tracing::{debug, info};
use validator::Validate;
use zeroize::Zeroizing;

use crate::database::DatabaseConfig;
use crate::errors::{StartupError, StartupResult};

/// Environment variable prefix, e.g. `GRAPH_EMBEDDED=false`
pub const ENV_PREFIX: &str = "GRAPH";

pub const EMBEDDED_KEY: &str = "embedded";
pub const PATH_KEY: &str = "path";
pub const URI_KEY: &str = "uri";
pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";
pub const REPOSITORIES_ENABLED_KEY: &str = "repositories.enabled";

pub const DEFAULT_PATH: &str = "./test.db";
pub const DEFAULT_URI: &str = "localhost:7474/data/db";

/// Layered key/value configuration
///
/// Precedence from lowest to highest: configuration file, `.env`, process
/// environment, programmatic overrides.
#[derive(Debug, Clone, Default)]
pub struct PropertySource {
    config: Config,
}

impl PropertySource {
    /// A source with no keys at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Load the file at `path` (required when given), then `.env` and `GRAPH_*` variables
    pub fn load(path: Option<&Path>) -> StartupResult<Self> {
        match dotenvy::dotenv() {
            Ok(env_file) => debug!(path = %env_file.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(StartupError::invalid_property(".env", e)),
        }

        let mut builder = Config::builder();
        if let Some(path) = path {
            info!(path = %path.display(), "Loading graph properties");
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(Self { config })
    }

    /// Build a source from literal key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> StartupResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::empty().with_overrides(pairs)
    }

    /// Layer programmatic overrides on top of this source
    pub fn with_overrides<I, K, V>(self, pairs: I) -> StartupResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = Config::builder().add_source(self.config);
        for (key, value) in pairs {
            builder = builder.set_override(key.as_ref(), value.into())?;
        }
        Ok(Self {
            config: builder.build()?,
        })
    }

    /// Drop a top-level key from every layer
    pub fn remove(&mut self, key: &str) -> StartupResult<()> {
        let mut entries = self.config.collect()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }

        let mut builder = Config::builder();
        for (name, value) in entries {
            builder = builder.set_override(name.as_str(), value)?;
        }
        self.config = builder.build()?;
        Ok(())
    }

    pub fn get_string(&self, key: &str) -> StartupResult<Option<String>> {
        Self::optional(key, self.config.get_string(key))
    }

    pub fn get_bool(&self, key: &str) -> StartupResult<Option<bool>> {
        Self::optional(key, self.config.get_bool(key))
    }

    fn optional<T>(key: &str, value: Result<T, ConfigError>) -> StartupResult<Option<T>> {
        match value {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(StartupError::invalid_property(key, e)),
        }
    }
}

/// Graph client configuration bound from a [`PropertySource`]
#[derive(Clone, Validate)]
pub struct GraphProperties {
    pub embedded: bool,
    #[validate(length(min = 1))]
    pub path: String,
    #[validate(length(min = 1))]
    pub uri: String,
    pub username: Option<String>,
    password: Option<Zeroizing<String>>,
    pub repositories_enabled: bool,
}

impl GraphProperties {
    /// Bind the record, falling back to defaults for absent keys
    pub fn bind(source: &PropertySource) -> StartupResult<Self> {
        let defaults = Self::default();
        let properties = Self {
            embedded: source.get_bool(EMBEDDED_KEY)?.unwrap_or(defaults.embedded),
            path: source.get_string(PATH_KEY)?.unwrap_or(defaults.path),
            uri: source.get_string(URI_KEY)?.unwrap_or(defaults.uri),
            username: source.get_string(USERNAME_KEY)?,
            password: source.get_string(PASSWORD_KEY)?.map(Zeroizing::new),
            repositories_enabled: source
                .get_bool(REPOSITORIES_ENABLED_KEY)?
                .unwrap_or(defaults.repositories_enabled),
        };

        properties.validate().map_err(|errors| {
            let key = errors
                .field_errors()
                .keys()
                .next()
                .map(|field| field.to_string())
                .unwrap_or_default();
            StartupError::invalid_property(key, errors)
        })?;

        Ok(properties)
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().map(String::as_str)
    }

    /// Both halves of the credential pair are set
    pub fn credentials_defined(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Wipe the credential from memory
    pub fn clear_password(&mut self) {
        self.password = None;
    }

    /// Database configuration for the selected connection variant
    pub fn database_config(&self) -> DatabaseConfig {
        if self.embedded {
            return DatabaseConfig::embedded(self.path.clone());
        }

        match &self.username {
            Some(username) => DatabaseConfig::neo4j(
                self.uri.clone(),
                username.clone(),
                self.password().unwrap_or_default().to_string(),
            ),
            None => DatabaseConfig::neo4j_anonymous(self.uri.clone()),
        }
    }
}

impl Default for GraphProperties {
    fn default() -> Self {
        Self {
            embedded: true,
            path: DEFAULT_PATH.to_string(),
            uri: DEFAULT_URI.to_string(),
            username: None,
            password: None,
            repositories_enabled: true,
        }
    }
}

impl std::fmt::Debug for GraphProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphProperties")
            .field("embedded", &self.embedded)
            .field("path", &self.path)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("repositories_enabled", &self.repositories_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseType;

    #[test]
    fn test_defaults_when_source_is_empty() {
        let properties = GraphProperties::bind(&PropertySource::empty()).unwrap();

        assert!(properties.embedded);
        assert_eq!(properties.path, "./test.db");
        assert_eq!(properties.uri, "localhost:7474/data/db");
        assert!(properties.username.is_none());
        assert!(properties.repositories_enabled);
    }

    #[test]
    fn test_bind_remote_credentials() {
        let source = PropertySource::from_pairs([
            ("embedded", "false"),
            ("uri", "db.example.com:7474"),
            ("username", "alice"),
            ("password", "secret"),
        ])
        .unwrap();

        let properties = GraphProperties::bind(&source).unwrap();
        assert!(!properties.embedded);
        assert!(properties.credentials_defined());
        assert_eq!(properties.password(), Some("secret"));

        let config = properties.database_config();
        assert_eq!(config.database_type, DatabaseType::Neo4j);
        assert_eq!(config.uri, "db.example.com:7474");
        assert_eq!(config.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_nested_key_and_case_insensitive_bool() {
        let source = PropertySource::from_pairs([("repositories.enabled", "FALSE")]).unwrap();
        let properties = GraphProperties::bind(&source).unwrap();
        assert!(!properties.repositories_enabled);
    }

    #[test]
    fn test_malformed_bool_names_the_key() {
        let source = PropertySource::from_pairs([("embedded", "sometimes")]).unwrap();

        match GraphProperties::bind(&source) {
            Err(StartupError::InvalidProperty { key, .. }) => assert_eq!(key, "embedded"),
            other => panic!("expected invalid property, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_path_fails_validation() {
        let source = PropertySource::from_pairs([("path", "")]).unwrap();

        match GraphProperties::bind(&source) {
            Err(StartupError::InvalidProperty { key, .. }) => assert_eq!(key, "path"),
            other => panic!("expected invalid property, got {:?}", other),
        }
    }

    #[test]
    fn test_overrides_take_precedence() {
        let source = PropertySource::from_pairs([("path", "/var/lib/graph")])
            .unwrap()
            .with_overrides([("path", "/tmp/graph")])
            .unwrap();

        assert_eq!(source.get_string("path").unwrap().as_deref(), Some("/tmp/graph"));
        assert_eq!(source.get_string("uri").unwrap(), None);
    }

    #[test]
    fn test_remove_drops_only_the_key() {
        let mut source = PropertySource::from_pairs([
            ("password", "secret"),
            ("username", "alice"),
            ("repositories.enabled", "false"),
        ])
        .unwrap();

        source.remove("password").unwrap();

        assert_eq!(source.get_string("password").unwrap(), None);
        assert_eq!(source.get_string("username").unwrap().as_deref(), Some("alice"));
        assert_eq!(source.get_bool("repositories.enabled").unwrap(), Some(false));
    }

    #[test]
    fn test_clear_password_and_redacted_debug() {
        let mut properties = GraphProperties::default().with_password("secret");
        assert!(!format!("{:?}", properties).contains("secret"));

        properties.clear_password();
        assert_eq!(properties.password(), None);
    }
}
