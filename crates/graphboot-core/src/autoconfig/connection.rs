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

use tracing::info;

use super::GRAPH_CONNECTION;
use crate::capability::GRAPH_DRIVER;
use crate::condition::Condition;
use crate::connection::GraphConnectionFactory;
use crate::properties::GraphProperties;
use crate::registrar::ComponentEntry;

pub(super) fn entry(properties: &GraphProperties) -> ComponentEntry<'_> {
    ComponentEntry::new(GRAPH_CONNECTION, move |_| {
        let factory = GraphConnectionFactory::from_properties(properties);
        info!(mode = %factory.mode(), target = %factory.target(), "Configured graph connection");
        Ok(factory)
    })
    .when(Condition::on_capability([GRAPH_DRIVER]))
    .when(Condition::on_missing_component(GRAPH_CONNECTION))
    .when(Condition::on_missing_type::<GraphConnectionFactory>())
}
