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

//! Capability manifest
//!
//! The set of optional collaborators available to this build. Conditions of
//! the form "capability present" are checked against it.

use std::collections::BTreeSet;

/// A graph driver is linked in
pub const GRAPH_DRIVER: &str = "graph-driver";
/// The template and transaction layer is available
pub const GRAPH_TEMPLATE: &str = "graph-template";
/// Typed repositories are available
pub const GRAPH_REPOSITORY: &str = "graph-repository";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityManifest {
    capabilities: BTreeSet<String>,
}

impl CapabilityManifest {
    /// An empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything this crate ships
    pub fn builtin() -> Self {
        [GRAPH_DRIVER, GRAPH_TEMPLATE, GRAPH_REPOSITORY]
            .into_iter()
            .collect()
    }

    pub fn with(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn without(mut self, capability: &str) -> Self {
        self.capabilities.remove(capability);
        self
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilityManifest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_manifest() {
        let manifest = CapabilityManifest::builtin();
        assert!(manifest.contains(GRAPH_DRIVER));
        assert!(manifest.contains(GRAPH_REPOSITORY));

        let trimmed = manifest.without(GRAPH_REPOSITORY);
        assert!(!trimmed.contains(GRAPH_REPOSITORY));
        assert!(trimmed.contains(GRAPH_TEMPLATE));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let manifest = CapabilityManifest::new().with("b").with("a");
        assert_eq!(manifest.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
