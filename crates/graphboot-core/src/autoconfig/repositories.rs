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

use super::data::dependency;
use super::{GRAPH_REPOSITORIES, GRAPH_TEMPLATE};
use crate::capability::{self, GRAPH_DRIVER, GRAPH_REPOSITORY};
use crate::condition::Condition;
use crate::properties::REPOSITORIES_ENABLED_KEY;
use crate::registrar::ComponentEntry;
use crate::repository::GraphRepositories;
use crate::template::GraphTemplate;

pub(super) fn entry<'a>() -> ComponentEntry<'a> {
    ComponentEntry::new(GRAPH_REPOSITORIES, |ctx| {
        let template = dependency::<GraphTemplate>(ctx, GRAPH_TEMPLATE)?;
        Ok(GraphRepositories::new(template))
    })
    .after(GRAPH_TEMPLATE)
    .when(Condition::on_capability([
        GRAPH_DRIVER,
        capability::GRAPH_TEMPLATE,
        GRAPH_REPOSITORY,
    ]))
    .when(Condition::on_missing_component(GRAPH_REPOSITORIES))
    .when(Condition::on_property(REPOSITORIES_ENABLED_KEY, "true", true))
}
