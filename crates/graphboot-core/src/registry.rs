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

//! Identifier to instance registry populated during startup

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use serde::Serialize;
use thiserror::Error;

/// Type-erased registered instance
pub type Component = Arc<dyn Any + Send + Sync>;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Identifier '{id}' is already bound")]
    Duplicate { id: String },

    #[error("No component registered under '{id}'")]
    Missing { id: String },

    #[error("Component '{id}' is a {actual}, not a {expected}")]
    TypeMismatch {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// A constructed instance, not yet bound to an identifier
pub(crate) struct Instance {
    type_id: TypeId,
    type_name: &'static str,
    component: Component,
}

impl Instance {
    pub(crate) fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            component: value,
        }
    }
}

/// A bound component together with its metadata
#[derive(Clone)]
pub struct Registration {
    id: String,
    aliases: Vec<String>,
    type_id: TypeId,
    type_name: &'static str,
    component: Component,
}

impl Registration {
    pub(crate) fn new(id: String, aliases: Vec<String>, instance: Instance) -> Self {
        let Instance { type_id, type_name, component } = instance;
        Self {
            id,
            aliases,
            type_id,
            type_name,
            component,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("aliases", &self.aliases)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// What happened to one entry during the startup pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum Outcome {
    Registered,
    ConditionFailed(String),
    AlreadyBound(String),
}

/// Condition report line for a single entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionOutcome {
    pub id: String,
    pub outcome: Outcome,
}

impl ConditionOutcome {
    pub fn registered(&self) -> bool {
        self.outcome == Outcome::Registered
    }
}

/// Component registry
///
/// Entries are appended while the registrar runs; once a `Registry` has been
/// handed back to the caller it exposes lookups only. Registration order is
/// preserved.
#[derive(Debug, Default)]
pub struct Registry {
    registrations: Vec<Registration>,
    index: HashMap<String, usize>,
    outcomes: Vec<ConditionOutcome>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// True when `id` is bound as an identifier or an alias
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn contains_type<T: Any>(&self) -> bool {
        self.contains_type_id(TypeId::of::<T>())
    }

    pub fn contains_type_id(&self, type_id: TypeId) -> bool {
        self.registrations.iter().any(|r| r.type_id == type_id)
    }

    /// Look up a component by identifier or alias
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.lookup(id)
            .and_then(|registration| registration.component.clone().downcast::<T>().ok())
    }

    /// Like [`Registry::get`], but reports why the lookup failed
    pub fn require<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, RegistryError> {
        let registration = self.lookup(id).ok_or_else(|| RegistryError::Missing { id: id.to_string() })?;
        registration
            .component
            .clone()
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                id: id.to_string(),
                expected: std::any::type_name::<T>(),
                actual: registration.type_name,
            })
    }

    /// First registered component of type `T`
    pub fn get_by_type<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.registrations
            .iter()
            .find(|r| r.type_id == TypeId::of::<T>())
            .and_then(|r| r.component.clone().downcast::<T>().ok())
    }

    pub fn registration(&self, id: &str) -> Option<&Registration> {
        self.lookup(id)
    }

    /// Registrations in the order they were bound
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Condition report of the startup pass that produced this registry
    pub fn outcomes(&self) -> &[ConditionOutcome] {
        &self.outcomes
    }

    /// First of `names` that is already bound, if any
    pub(crate) fn first_bound<'n>(&self, mut names: impl Iterator<Item = &'n str>) -> Option<&'n str> {
        names.find(|name| self.contains(name))
    }

    pub(crate) fn insert(&mut self, registration: Registration) -> Result<(), RegistryError> {
        if let Some(bound) = self.first_bound(registration.names()) {
            return Err(RegistryError::Duplicate { id: bound.to_string() });
        }

        let position = self.registrations.len();
        for name in registration.names() {
            self.index.insert(name.to_string(), position);
        }
        self.registrations.push(registration);
        Ok(())
    }

    pub(crate) fn record(&mut self, id: &str, outcome: Outcome) {
        self.outcomes.push(ConditionOutcome {
            id: id.to_string(),
            outcome,
        });
    }

    fn lookup(&self, id: &str) -> Option<&Registration> {
        self.index.get(id).map(|&position| &self.registrations[position])
    }
}

/// Builds the seed registry handed to the registrar
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` under `id`
    pub fn with<T: Any + Send + Sync>(self, id: impl Into<String>, value: T) -> Result<Self, RegistryError> {
        self.with_shared(id, Arc::new(value))
    }

    /// Bind an already shared instance under `id`
    pub fn with_shared<T: Any + Send + Sync>(mut self, id: impl Into<String>, value: Arc<T>) -> Result<Self, RegistryError> {
        self.registry
            .insert(Registration::new(id.into(), Vec::new(), Instance::new(value)))?;
        Ok(self)
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
