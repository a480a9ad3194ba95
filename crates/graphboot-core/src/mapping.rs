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

//! Entity mapping
//!
//! Entities are plain serde types. The mapping context knows which entity
//! types are managed and converts between them and property maps.

use std::any::TypeId;
use std::collections::HashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::database::{NodeData, QueryParameter};

/// Identifier of the entity catalog component seeded by applications
pub const GRAPH_ENTITY_CATALOG: &str = "graph-entity-catalog";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Relationship,
}

/// A type persisted as a labelled node (or relationship) in the graph
///
/// The identifier is assigned by the database on first save.
pub trait GraphEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const LABEL: &'static str;
    const KIND: EntityKind = EntityKind::Node;

    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
}

/// Mapping errors
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Label '{label}' is claimed by both {first} and {second}")]
    DuplicateLabel {
        label: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("Invalid label '{0}'")]
    InvalidLabel(&'static str),

    #[error("{0} is not a managed entity")]
    UnknownEntity(&'static str),

    #[error("{0} is a relationship entity and cannot be stored as a node")]
    NotANode(&'static str),

    #[error("{0} is a node entity and cannot connect two nodes")]
    NotARelationship(&'static str),

    #[error("Entity {0} must serialize to a map")]
    NotAMap(&'static str),

    #[error("Expected label '{expected}', node has {found:?}")]
    LabelMismatch {
        expected: &'static str,
        found: Vec<String>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    label: &'static str,
    kind: EntityKind,
    type_id: TypeId,
    type_name: &'static str,
}

impl EntityDescriptor {
    pub fn of<T: GraphEntity>() -> Self {
        Self {
            label: T::LABEL,
            kind: T::KIND,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// The entity types an application wants managed
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: Vec<EntityDescriptor>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: GraphEntity>(mut self) -> Self {
        self.entities.push(EntityDescriptor::of::<T>());
        self
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Metadata for the managed entity set
#[derive(Debug, Clone, Default)]
pub struct MappingContext {
    entities: Vec<EntityDescriptor>,
    by_type: HashMap<TypeId, usize>,
}

impl MappingContext {
    pub fn new(entities: impl IntoIterator<Item = EntityDescriptor>) -> Result<Self, MappingError> {
        let mut context = Self::default();
        let mut labels: HashMap<&'static str, &'static str> = HashMap::new();

        for descriptor in entities {
            if context.by_type.contains_key(&descriptor.type_id) {
                continue;
            }
            if !is_identifier(descriptor.label) {
                return Err(MappingError::InvalidLabel(descriptor.label));
            }
            if let Some(first) = labels.insert(descriptor.label, descriptor.type_name) {
                return Err(MappingError::DuplicateLabel {
                    label: descriptor.label,
                    first,
                    second: descriptor.type_name,
                });
            }

            context.by_type.insert(descriptor.type_id, context.entities.len());
            context.entities.push(descriptor);
        }

        Ok(context)
    }

    /// The entity set the context was constructed with
    pub fn initial_entity_set(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    pub fn contains<T: GraphEntity>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn descriptor<T: GraphEntity>(&self) -> Result<&EntityDescriptor, MappingError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&index| &self.entities[index])
            .ok_or(MappingError::UnknownEntity(std::any::type_name::<T>()))
    }

    /// Property map for `entity`, without its identifier and unset fields
    pub fn to_properties<T: GraphEntity>(&self, entity: &T) -> Result<HashMap<String, QueryParameter>, MappingError> {
        self.descriptor::<T>()?;

        match serde_json::to_value(entity)? {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .filter(|(key, value)| key != "id" && !value.is_null())
                .map(|(key, value)| (key, QueryParameter::from(value)))
                .collect()),
            _ => Err(MappingError::NotAMap(std::any::type_name::<T>())),
        }
    }

    /// Rebuild an entity from a stored node
    pub fn from_node<T: GraphEntity>(&self, node: NodeData) -> Result<T, MappingError> {
        let descriptor = self.descriptor::<T>()?;
        if !node.labels.iter().any(|label| label == descriptor.label) {
            return Err(MappingError::LabelMismatch {
                expected: descriptor.label,
                found: node.labels,
            });
        }

        let object: serde_json::Map<String, serde_json::Value> = node
            .properties
            .into_iter()
            .map(|(key, value)| (key, serde_json::Value::from(value)))
            .collect();

        let mut entity: T = serde_json::from_value(serde_json::Value::Object(object))?;
        entity.set_id(node.id);
        Ok(entity)
    }
}

fn is_identifier(label: &str) -> bool {
    !label.is_empty()
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !label.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) struct City {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub id: Option<String>,
        pub name: String,
        pub population: i64,
        #[serde(default)]
        pub nickname: Option<String>,
    }

    impl City {
        pub fn new(name: &str, population: i64) -> Self {
            Self {
                id: None,
                name: name.to_string(),
                population,
                nickname: None,
            }
        }
    }

    impl GraphEntity for City {
        const LABEL: &'static str = "City";

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) struct Road {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub id: Option<String>,
        pub length_km: i64,
    }

    impl GraphEntity for Road {
        const LABEL: &'static str = "ROAD";
        const KIND: EntityKind = EntityKind::Relationship;

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Town {
        name: String,
    }

    impl GraphEntity for Town {
        const LABEL: &'static str = "City";

        fn id(&self) -> Option<&str> {
            None
        }

        fn set_id(&mut self, _id: String) {}
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let catalog = EntityCatalog::new().with::<City>().with::<Town>();
        let err = MappingContext::new(catalog.entities().iter().cloned()).unwrap_err();
        assert!(matches!(err, MappingError::DuplicateLabel { label: "City", .. }));
    }

    #[test]
    fn test_initial_entity_set_keeps_catalog_order() {
        let catalog = EntityCatalog::new().with::<City>().with::<Road>().with::<City>();
        let context = MappingContext::new(catalog.entities().iter().cloned()).unwrap();

        let labels: Vec<_> = context.initial_entity_set().iter().map(|d| d.label()).collect();
        assert_eq!(labels, vec!["City", "ROAD"]);
        assert!(context.contains::<City>());
        assert!(!context.contains::<Town>());
    }

    #[test]
    fn test_properties_round_trip_through_node() {
        let context = MappingContext::new([EntityDescriptor::of::<City>()]).unwrap();
        let mut city = City::new("Lyon", 513_275);
        city.id = Some("ignored".to_string());

        let properties = context.to_properties(&city).unwrap();
        assert!(!properties.contains_key("id"));
        assert!(!properties.contains_key("nickname"));

        let node = NodeData {
            id: "n-1".to_string(),
            labels: vec!["City".to_string()],
            properties,
        };
        let restored: City = context.from_node(node).unwrap();
        assert_eq!(restored.id.as_deref(), Some("n-1"));
        assert_eq!(restored.name, "Lyon");
    }

    #[test]
    fn test_unmanaged_entity_rejected() {
        let context = MappingContext::default();
        assert!(matches!(
            context.to_properties(&City::new("Oslo", 1)),
            Err(MappingError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_label_mismatch() {
        let context = MappingContext::new([EntityDescriptor::of::<City>()]).unwrap();
        let node = NodeData {
            id: "n-2".to_string(),
            labels: vec!["Person".to_string()],
            properties: HashMap::new(),
        };
        assert!(matches!(
            context.from_node::<City>(node),
            Err(MappingError::LabelMismatch { .. })
        ));
    }
}
