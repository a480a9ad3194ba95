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

//! Registration conditions

use std::any::{Any, TypeId};

use crate::errors::StartupResult;
use crate::registrar::StartupContext;

/// A predicate gating one component entry
///
/// Conditions are pure: they read the capability manifest, the registry as it
/// stands when the entry is reached, and the property source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Every named capability is in the manifest
    OnCapability(Vec<String>),
    /// None of the identifiers is bound, as identifier or alias
    OnMissingComponent(Vec<String>),
    /// No registered component has this concrete type
    OnMissingType {
        type_id: TypeId,
        type_name: &'static str,
    },
    /// The property equals `having_value`, ignoring case
    ///
    /// An empty `having_value` matches anything but `false`. When the key is
    /// absent, `match_if_missing` decides.
    OnProperty {
        key: String,
        having_value: String,
        match_if_missing: bool,
    },
}

impl Condition {
    pub fn on_capability<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::OnCapability(capabilities.into_iter().map(Into::into).collect())
    }

    pub fn on_missing_component(id: impl Into<String>) -> Self {
        Condition::OnMissingComponent(vec![id.into()])
    }

    pub fn on_missing_type<T: Any>() -> Self {
        Condition::OnMissingType {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn on_property(key: impl Into<String>, having_value: impl Into<String>, match_if_missing: bool) -> Self {
        Condition::OnProperty {
            key: key.into(),
            having_value: having_value.into(),
            match_if_missing,
        }
    }

    /// Evaluate against the current startup state
    ///
    /// Fails only when a property value cannot be read as a string.
    pub fn evaluate(&self, ctx: &StartupContext<'_>) -> StartupResult<bool> {
        let matched = match self {
            Condition::OnCapability(capabilities) => capabilities
                .iter()
                .all(|capability| ctx.capabilities.contains(capability)),
            Condition::OnMissingComponent(ids) => !ids.iter().any(|id| ctx.registry.contains(id)),
            Condition::OnMissingType { type_id, .. } => !ctx.registry.contains_type_id(*type_id),
            Condition::OnProperty {
                key,
                having_value,
                match_if_missing,
            } => match ctx.properties.get_string(key)? {
                None => *match_if_missing,
                Some(value) if having_value.is_empty() => !value.eq_ignore_ascii_case("false"),
                Some(value) => value.eq_ignore_ascii_case(having_value),
            },
        };
        Ok(matched)
    }

    /// Human readable form used in the condition report
    pub fn describe(&self) -> String {
        match self {
            Condition::OnCapability(capabilities) => {
                format!("capabilities [{}] present", capabilities.join(", "))
            }
            Condition::OnMissingComponent(ids) => {
                format!("no component named [{}]", ids.join(", "))
            }
            Condition::OnMissingType { type_name, .. } => {
                format!("no component of type {}", type_name)
            }
            Condition::OnProperty {
                key,
                having_value,
                match_if_missing,
            } => {
                let expected = if having_value.is_empty() { "set" } else { having_value.as_str() };
                format!(
                    "property '{}' is {} (match if missing: {})",
                    key, expected, match_if_missing
                )
            }
        }
    }
}
