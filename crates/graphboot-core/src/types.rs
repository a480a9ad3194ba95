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

use crate::autoconfig::{
    GRAPH_CONNECTION, GRAPH_REPOSITORIES, GRAPH_TEMPLATE, GRAPH_TRANSACTION_MANAGER,
};
use crate::connection::GraphConnectionFactory;
use crate::registry::{Registry, RegistryError};
use crate::repository::GraphRepositories;
use crate::template::GraphTemplate;
use crate::transaction::GraphTransactionManager;

/// Graph clients resolved from a bootstrapped registry
#[derive(Debug, Clone)]
pub struct GraphClients {
    pub connection: Arc<GraphConnectionFactory>,
    pub template: Arc<GraphTemplate>,
    pub transaction_manager: Arc<GraphTransactionManager>,
    pub repositories: Option<Arc<GraphRepositories>>,
}

impl GraphClients {
    pub fn from_registry(registry: &Registry) -> Result<Self, RegistryError> {
        Ok(Self {
            connection: registry.require(GRAPH_CONNECTION)?,
            template: registry.require(GRAPH_TEMPLATE)?,
            transaction_manager: registry.require(GRAPH_TRANSACTION_MANAGER)?,
            repositories: registry.get(GRAPH_REPOSITORIES),
        })
    }
}
