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

//! # graphboot core
//!
//! Conditional, ordered registration of graph database components.
//!
//! A table of [`ComponentEntry`] values is interpreted once at startup by the
//! [`Registrar`]: entries run in prerequisite order, each gated by
//! [`Condition`]s over a [`CapabilityManifest`], the registry built so far and
//! a [`PropertySource`]. The graph auto-configuration in [`autoconfig`] wires
//! a connection factory, mapping context, template, transaction manager and
//! repositories this way.

pub mod autoconfig;
pub mod capability;
pub mod condition;
pub mod connection;
pub mod database;
pub mod errors;
pub mod mapping;
pub mod properties;
pub mod registrar;
pub mod registry;
pub mod repository;
pub mod template;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use autoconfig::{bootstrap, graph_entries};
pub use capability::CapabilityManifest;
pub use condition::Condition;
pub use connection::{ConnectionMode, GraphConnectionFactory};
pub use errors::{DataAccessError, DataAccessResult, FactoryError, StartupError, StartupResult};
pub use mapping::{EntityCatalog, EntityDescriptor, EntityKind, GraphEntity, MappingContext, MappingError};
pub use properties::{GraphProperties, PropertySource};
pub use registrar::{ComponentEntry, Registrar, StartupContext};
pub use registry::{ConditionOutcome, Outcome, Registration, Registry, RegistryBuilder, RegistryError};
pub use repository::{GraphRepositories, GraphRepository};
pub use template::GraphTemplate;
pub use transaction::GraphTransactionManager;
pub use types::GraphClients;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports() {
        // The public surface is usable from one import
        let _manifest = CapabilityManifest::builtin();
        let _properties = GraphProperties::default();
        let _registry = Registry::builder().build();
    }
}
