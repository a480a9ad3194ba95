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

//! Graph auto-configuration
//!
//! The registration table wiring the connection factory, mapping context,
//! template, transaction manager and repositories.

mod connection;
mod data;
mod repositories;


use tracing::{info, instrument};

use crate::capability::CapabilityManifest;
use crate::errors::StartupResult;
use crate::properties::{GraphProperties, PropertySource, PASSWORD_KEY};
use crate::registrar::{ComponentEntry, Registrar};
use crate::registry::Registry;

pub use crate::mapping::GRAPH_ENTITY_CATALOG;

pub const GRAPH_CONNECTION: &str = "graph-connection";
pub const GRAPH_MAPPING_CONTEXT: &str = "graph-mapping-context";
pub const GRAPH_TEMPLATE: &str = "graph-template";
pub const GRAPH_TRANSACTION_MANAGER: &str = "graph-transaction-manager";
pub const TRANSACTION_MANAGER_ALIAS: &str = "transaction-manager";
pub const GRAPH_REPOSITORIES: &str = "graph-repositories";

/// Every graph component entry, in declaration order
pub fn graph_entries(properties: &GraphProperties) -> Vec<ComponentEntry<'_>> {
    let mut entries = vec![connection::entry(properties)];
    entries.extend(data::entries());
    entries.push(repositories::entry());
    entries
}

/// Bind [`GraphProperties`] from `source` and register the graph components on top of `seed`
///
/// The `password` key is removed from `source` once bound, whether or not binding succeeds.
pub fn bootstrap(source: &mut PropertySource, capabilities: &CapabilityManifest, seed: Registry) -> StartupResult<Registry> {
    let bound = GraphProperties::bind(source);
    source.remove(PASSWORD_KEY)?;
    let mut properties = bound?;
    register_graph(&mut properties, source, capabilities, seed)
}

/// Register the graph components, wiping the credential afterwards whatever the outcome
#[instrument(skip_all, fields(embedded = properties.embedded))]
pub(crate) fn register_graph(
    properties: &mut GraphProperties,
    source: &PropertySource,
    capabilities: &CapabilityManifest,
    seed: Registry,
) -> StartupResult<Registry> {
    let result = Registrar::new(capabilities, source).register(graph_entries(properties), seed);
    properties.clear_password();

    if let Ok(registry) = &result {
        info!(components = ?registry.ids().collect::<Vec<_>>(), "Graph components ready");
    }
    result
}
