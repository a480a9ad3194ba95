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

//! Conditional registrar
//!
//! Interprets a table of [`ComponentEntry`] values once, at startup: entries
//! are ordered by their prerequisites, gated by their conditions, and the
//! survivors are constructed and bound into a [`Registry`].

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::capability::CapabilityManifest;
use crate::condition::Condition;
use crate::errors::{FactoryError, StartupError, StartupResult};
use crate::properties::PropertySource;
use crate::registry::{Instance, Outcome, Registration, Registry};

/// State visible to conditions and factories while an entry is processed
#[derive(Debug, Clone, Copy)]
pub struct StartupContext<'a> {
    pub capabilities: &'a CapabilityManifest,
    pub properties: &'a PropertySource,
    pub registry: &'a Registry,
}

type Factory<'a> = Box<dyn FnOnce(&StartupContext<'_>) -> Result<Instance, FactoryError> + 'a>;

/// One row of the registration table
pub struct ComponentEntry<'a> {
    id: String,
    aliases: Vec<String>,
    conditions: Vec<Condition>,
    after: Vec<String>,
    factory: Factory<'a>,
}

impl<'a> ComponentEntry<'a> {
    pub fn new<T, F>(id: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce(&StartupContext<'_>) -> Result<T, FactoryError> + 'a,
    {
        Self {
            id: id.into(),
            aliases: Vec::new(),
            conditions: Vec::new(),
            after: Vec::new(),
            factory: Box::new(move |ctx: &StartupContext<'_>| factory(ctx).map(|value| Instance::new(Arc::new(value)))),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Run only after the entry named `id`, when the table has one
    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after.push(id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl std::fmt::Debug for ComponentEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentEntry")
            .field("id", &self.id)
            .field("aliases", &self.aliases)
            .field("conditions", &self.conditions)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

/// Runs registration tables against one capability manifest and property source
#[derive(Debug, Clone, Copy)]
pub struct Registrar<'a> {
    capabilities: &'a CapabilityManifest,
    properties: &'a PropertySource,
}

impl<'a> Registrar<'a> {
    pub fn new(capabilities: &'a CapabilityManifest, properties: &'a PropertySource) -> Self {
        Self {
            capabilities,
            properties,
        }
    }

    /// Register every entry whose conditions hold, on top of `seed`
    ///
    /// Any error aborts the whole pass and the partially filled registry is dropped.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub fn register(&self, entries: Vec<ComponentEntry<'_>>, seed: Registry) -> StartupResult<Registry> {
        let order = execution_order(&entries)?;
        let mut slots: Vec<Option<ComponentEntry<'_>>> = entries.into_iter().map(Some).collect();
        let mut registry = seed;

        for index in order {
            let Some(entry) = slots[index].take() else {
                continue;
            };
            let ComponentEntry {
                id,
                aliases,
                conditions,
                factory,
                ..
            } = entry;

            let instance = {
                let ctx = StartupContext {
                    capabilities: self.capabilities,
                    properties: self.properties,
                    registry: &registry,
                };

                let mut failed = None;
                for condition in &conditions {
                    if !condition.evaluate(&ctx)? {
                        failed = Some(condition.describe());
                        break;
                    }
                }

                if let Some(reason) = failed {
                    debug!(component = %id, %reason, "Condition not met, skipping");
                    registry.record(&id, Outcome::ConditionFailed(reason));
                    continue;
                }

                let names = std::iter::once(id.as_str()).chain(aliases.iter().map(String::as_str));
                if let Some(bound) = registry.first_bound(names) {
                    let bound = bound.to_string();
                    warn!(component = %id, %bound, "Identifier already bound, skipping");
                    registry.record(&id, Outcome::AlreadyBound(bound));
                    continue;
                }

                factory(&ctx).map_err(|source| StartupError::Factory {
                    id: id.clone(),
                    source,
                })?
            };

            registry.insert(Registration::new(id.clone(), aliases, instance))?;
            registry.record(&id, Outcome::Registered);
            debug!(component = %id, "Registered component");
        }

        info!(registered = registry.len(), "Startup registration finished");
        Ok(registry)
    }
}

/// Stable topological order of `entries` by their `after` relations
///
/// Among entries that are ready, the one listed first runs first.
/// Prerequisites that name no entry in the table are ignored.
fn execution_order(entries: &[ComponentEntry<'_>]) -> StartupResult<Vec<usize>> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        for name in entry.names() {
            positions.entry(name).or_insert(index);
        }
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut pending: Vec<usize> = vec![0; entries.len()];
    for (index, entry) in entries.iter().enumerate() {
        for prerequisite in &entry.after {
            match positions.get(prerequisite.as_str()) {
                Some(&before) => {
                    successors[before].push(index);
                    pending[index] += 1;
                }
                None => debug!(component = %entry.id, %prerequisite, "Ignoring unknown prerequisite"),
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..entries.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(entries.len());
    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &next in &successors[index] {
            pending[next] -= 1;
            if pending[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() == entries.len() {
        return Ok(order);
    }

    // Whatever is left sits on or between cycles; report only entries that reach themselves
    let ids: Vec<String> = (0..entries.len())
        .filter(|&i| pending[i] > 0 && on_cycle(i, &successors))
        .map(|i| entries[i].id.clone())
        .collect();
    warn!(?ids, "Prerequisite cycle detected");
    Err(StartupError::Cycle { ids })
}

/// `start` can reach itself through its successors
fn on_cycle(start: usize, successors: &[Vec<usize>]) -> bool {
    let mut stack = successors[start].clone();
    let mut seen = BTreeSet::new();
    while let Some(node) = stack.pop() {
        if node == start {
            return true;
        }
        if seen.insert(node) {
            stack.extend(successors[node].iter().copied());
        }
    }
    false
}
