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

use thiserror::Error;

use crate::database::DatabaseError;
use crate::mapping::MappingError;
use crate::registry::RegistryError;

/// Boxed error returned by component factories
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort the startup pass
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid value for property '{key}': {message}")]
    InvalidProperty { key: String, message: String },

    #[error("Failed to create component '{id}': {source}")]
    Factory {
        id: String,
        #[source]
        source: FactoryError,
    },

    #[error("Component ordering cycle between {ids:?}")]
    Cycle { ids: Vec<String> },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration source error: {0}")]
    Config(#[from] config::ConfigError),
}

impl StartupError {
    pub(crate) fn invalid_property(key: impl Into<String>, message: impl ToString) -> Self {
        StartupError::InvalidProperty {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Identifier of the component whose factory failed, if any
    pub fn component_id(&self) -> Option<&str> {
        match self {
            StartupError::Factory { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Errors surfaced by the template, repositories and transaction manager
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Entity {label} with id {id} not found")]
    EntityNotFound { label: String, id: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },
}

/// Result type alias for startup operations
pub type StartupResult<T> = Result<T, StartupError>;

/// Result type alias for data access operations
pub type DataAccessResult<T> = Result<T, DataAccessError>;
