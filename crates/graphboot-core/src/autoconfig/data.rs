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

use std::sync::Arc;

use super::{
    GRAPH_CONNECTION, GRAPH_ENTITY_CATALOG, GRAPH_MAPPING_CONTEXT, GRAPH_TEMPLATE,
    GRAPH_TRANSACTION_MANAGER, TRANSACTION_MANAGER_ALIAS,
};
use crate::capability;
use crate::condition::Condition;
use crate::connection::GraphConnectionFactory;
use crate::errors::FactoryError;
use crate::mapping::{EntityCatalog, MappingContext};
use crate::registrar::{ComponentEntry, StartupContext};
use crate::registry::RegistryError;
use crate::template::GraphTemplate;
use crate::transaction::GraphTransactionManager;

fn data_capabilities() -> Condition {
    Condition::on_capability([capability::GRAPH_DRIVER, capability::GRAPH_TEMPLATE])
}

/// Registered instance of `T`, whatever identifier it was bound under
pub(super) fn dependency<T: Send + Sync + 'static>(ctx: &StartupContext<'_>, id: &str) -> Result<Arc<T>, FactoryError> {
    ctx.registry
        .get_by_type::<T>()
        .ok_or_else(|| RegistryError::Missing { id: id.to_string() }.into())
}

pub(super) fn entries<'a>() -> Vec<ComponentEntry<'a>> {
    let mapping_context = ComponentEntry::new(GRAPH_MAPPING_CONTEXT, |ctx| {
        let catalog = ctx
            .registry
            .get::<EntityCatalog>(GRAPH_ENTITY_CATALOG)
            .unwrap_or_default();
        Ok(MappingContext::new(catalog.entities().iter().cloned())?)
    })
    .after(GRAPH_CONNECTION)
    .when(data_capabilities())
    .when(Condition::on_missing_type::<MappingContext>());

    let template = ComponentEntry::new(GRAPH_TEMPLATE, |ctx| {
        let connection = dependency::<GraphConnectionFactory>(ctx, GRAPH_CONNECTION)?;
        let mapping = dependency::<MappingContext>(ctx, GRAPH_MAPPING_CONTEXT)?;
        Ok(GraphTemplate::new(connection, mapping))
    })
    .after(GRAPH_CONNECTION)
    .after(GRAPH_MAPPING_CONTEXT)
    .when(data_capabilities())
    .when(Condition::on_missing_type::<GraphTemplate>());

    let transaction_manager = ComponentEntry::new(GRAPH_TRANSACTION_MANAGER, |ctx| {
        let template = dependency::<GraphTemplate>(ctx, GRAPH_TEMPLATE)?;
        Ok(GraphTransactionManager::new(template))
    })
    .alias(TRANSACTION_MANAGER_ALIAS)
    .after(GRAPH_TEMPLATE)
    .when(data_capabilities())
    .when(Condition::on_missing_type::<GraphTransactionManager>());

    vec![mapping_context, template, transaction_manager]
}
