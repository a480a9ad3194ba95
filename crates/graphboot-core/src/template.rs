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

//! Template facade over the graph database

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::connection::GraphConnectionFactory;
use crate::database::{DatabaseError, GraphDatabase, QueryParameter, QueryResult};
use crate::errors::{DataAccessError, DataAccessResult};
use crate::mapping::{EntityKind, GraphEntity, MappingContext, MappingError};

/// Entity-level operations on top of a lazily opened database
#[derive(Debug)]
pub struct GraphTemplate {
    connection: Arc<GraphConnectionFactory>,
    mapping: Arc<MappingContext>,
    database: OnceCell<Arc<dyn GraphDatabase>>,
}

impl GraphTemplate {
    pub fn new(connection: Arc<GraphConnectionFactory>, mapping: Arc<MappingContext>) -> Self {
        Self {
            connection,
            mapping,
            database: OnceCell::new(),
        }
    }

    /// A template bound to an already open database
    pub fn with_database(
        connection: Arc<GraphConnectionFactory>,
        mapping: Arc<MappingContext>,
        database: Arc<dyn GraphDatabase>,
    ) -> Self {
        Self {
            connection,
            mapping,
            database: OnceCell::from(database),
        }
    }

    pub fn connection(&self) -> &GraphConnectionFactory {
        &self.connection
    }

    pub fn mapping(&self) -> &MappingContext {
        &self.mapping
    }

    pub fn is_connected(&self) -> bool {
        self.database.initialized()
    }

    /// Database handle, connecting on first use
    pub async fn database(&self) -> DataAccessResult<Arc<dyn GraphDatabase>> {
        let database = self
            .database
            .get_or_try_init(|| self.connection.connect())
            .await?;
        Ok(Arc::clone(database))
    }

    /// Run a raw statement
    pub async fn query(&self, statement: &str, parameters: HashMap<String, QueryParameter>) -> DataAccessResult<QueryResult> {
        Ok(self.database().await?.execute(statement, parameters).await?)
    }

    /// Insert a new entity or update an existing one, returning its identifier
    #[instrument(skip(self, entity), fields(label = T::LABEL))]
    pub async fn save<T: GraphEntity>(&self, entity: &mut T) -> DataAccessResult<String> {
        if T::KIND == EntityKind::Relationship {
            return Err(MappingError::NotANode(std::any::type_name::<T>()).into());
        }

        let properties = self.mapping.to_properties(entity)?;
        let database = self.database().await?;

        match entity.id().map(str::to_string) {
            Some(id) => {
                database
                    .replace_node(&id, properties)
                    .await
                    .map_err(|e| Self::not_found_as::<T>(e, &id))?;
                debug!(%id, "Updated entity");
                Ok(id)
            }
            None => {
                let id = database
                    .create_node(vec![T::LABEL.to_string()], properties)
                    .await?;
                entity.set_id(id.clone());
                debug!(%id, "Created entity");
                Ok(id)
            }
        }
    }

    pub async fn find_one<T: GraphEntity>(&self, id: &str) -> DataAccessResult<Option<T>> {
        self.mapping.descriptor::<T>()?;

        match self.database().await?.get_node(id).await? {
            Some(node) if node.labels.iter().any(|label| label == T::LABEL) => {
                Ok(Some(self.mapping.from_node(node)?))
            }
            _ => Ok(None),
        }
    }

    /// Entities whose stored properties equal every given value
    pub async fn find_by<T: GraphEntity>(&self, properties: HashMap<String, QueryParameter>) -> DataAccessResult<Vec<T>> {
        self.mapping.descriptor::<T>()?;

        let nodes = self
            .database()
            .await?
            .find_nodes(Some(T::LABEL), properties)
            .await?;
        nodes
            .into_iter()
            .map(|node| self.mapping.from_node(node).map_err(DataAccessError::from))
            .collect()
    }

    pub async fn find_all<T: GraphEntity>(&self) -> DataAccessResult<Vec<T>> {
        self.find_by(HashMap::new()).await
    }

    pub async fn count<T: GraphEntity>(&self) -> DataAccessResult<usize> {
        self.mapping.descriptor::<T>()?;

        let nodes = self
            .database()
            .await?
            .find_nodes(Some(T::LABEL), HashMap::new())
            .await?;
        Ok(nodes.len())
    }

    /// Delete the entity and every relationship touching it
    pub async fn delete<T: GraphEntity>(&self, id: &str) -> DataAccessResult<()> {
        if self.find_one::<T>(id).await?.is_none() {
            return Err(DataAccessError::EntityNotFound {
                label: T::LABEL.to_string(),
                id: id.to_string(),
            });
        }

        self.database()
            .await?
            .delete_node(id)
            .await
            .map_err(|e| Self::not_found_as::<T>(e, id))
    }

    /// Connect two saved entities with a relationship entity
    #[instrument(skip(self, source, target, relationship), fields(relationship_type = R::LABEL))]
    pub async fn relate<A, B, R>(&self, source: &A, target: &B, relationship: &mut R) -> DataAccessResult<String>
    where
        A: GraphEntity,
        B: GraphEntity,
        R: GraphEntity,
    {
        if R::KIND != EntityKind::Relationship {
            return Err(MappingError::NotARelationship(std::any::type_name::<R>()).into());
        }
        if A::KIND == EntityKind::Relationship {
            return Err(MappingError::NotANode(std::any::type_name::<A>()).into());
        }
        if B::KIND == EntityKind::Relationship {
            return Err(MappingError::NotANode(std::any::type_name::<B>()).into());
        }

        self.mapping.descriptor::<A>()?;
        self.mapping.descriptor::<B>()?;
        let properties = self.mapping.to_properties(relationship)?;
        let source_id = Self::saved_id(source)?;
        let target_id = Self::saved_id(target)?;

        let id = self
            .database()
            .await?
            .create_edge(&source_id, &target_id, R::LABEL, properties)
            .await?;
        relationship.set_id(id.clone());
        Ok(id)
    }

    pub async fn health_check(&self) -> DataAccessResult<bool> {
        Ok(self.database().await?.health_check().await?)
    }

    /// Close the database if it was ever opened
    pub async fn close(&self) -> DataAccessResult<()> {
        if let Some(database) = self.database.get() {
            database.close().await?;
        }
        Ok(())
    }

    fn saved_id<T: GraphEntity>(entity: &T) -> DataAccessResult<String> {
        entity.id().map(str::to_string).ok_or_else(|| DataAccessError::EntityNotFound {
            label: T::LABEL.to_string(),
            id: String::new(),
        })
    }

    fn not_found_as<T: GraphEntity>(error: DatabaseError, id: &str) -> DataAccessError {
        match error {
            DatabaseError::NotFound(_) => DataAccessError::EntityNotFound {
                label: T::LABEL.to_string(),
                id: id.to_string(),
            },
            other => other.into(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::DatabaseConfig;
    use crate::mapping::tests::{City, Road};
    use crate::mapping::EntityDescriptor;

    pub(crate) fn embedded_template(dir: &tempfile::TempDir) -> GraphTemplate {
        let path = dir.path().join("graph.db").to_string_lossy().into_owned();
        let connection = Arc::new(GraphConnectionFactory::new(DatabaseConfig::embedded(path)));
        let mapping = Arc::new(
            MappingContext::new([EntityDescriptor::of::<City>(), EntityDescriptor::of::<Road>()]).unwrap(),
        );
        GraphTemplate::new(connection, mapping)
    }

    #[tokio::test]
    async fn test_connects_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        assert!(!template.is_connected());
        assert!(template.health_check().await.unwrap());
        assert!(template.is_connected());
    }

    #[tokio::test]
    async fn test_save_find_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        let mut lyon = City::new("Lyon", 513_275);
        let id = template.save(&mut lyon).await.unwrap();
        assert_eq!(lyon.id.as_deref(), Some(id.as_str()));

        lyon.population = 522_250;
        assert_eq!(template.save(&mut lyon).await.unwrap(), id);

        let found: City = template.find_one(&id).await.unwrap().unwrap();
        assert_eq!(found, lyon);
        assert_eq!(template.count::<City>().await.unwrap(), 1);

        template.delete::<City>(&id).await.unwrap();
        assert!(template.find_one::<City>(&id).await.unwrap().is_none());
        assert!(matches!(
            template.delete::<City>(&id).await,
            Err(DataAccessError::EntityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_by_filters_properties() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        template.save(&mut City::new("Lyon", 1)).await.unwrap();
        template.save(&mut City::new("Nice", 2)).await.unwrap();

        let mut filter = HashMap::new();
        filter.insert("name".to_string(), QueryParameter::from("Nice"));
        let cities: Vec<City> = template.find_by(filter).await.unwrap();
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].population, 2);
        assert_eq!(template.find_all::<City>().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_relate_saved_entities() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        let mut lyon = City::new("Lyon", 1);
        let mut paris = City::new("Paris", 2);
        template.save(&mut lyon).await.unwrap();
        template.save(&mut paris).await.unwrap();

        let mut road = Road { id: None, length_km: 465 };
        let edge_id = template.relate(&lyon, &paris, &mut road).await.unwrap();
        assert_eq!(road.id.as_deref(), Some(edge_id.as_str()));

        let edges = template
            .database()
            .await
            .unwrap()
            .find_edges(lyon.id.as_deref(), None, Some("ROAD"))
            .await
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_id, paris.id.clone().unwrap());
    }

    #[tokio::test]
    async fn test_relationship_entities_are_not_saved_as_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        let result = template.save(&mut Road { id: None, length_km: 1 }).await;
        assert!(matches!(result, Err(DataAccessError::Mapping(MappingError::NotANode(_)))));
        assert!(!template.is_connected());
    }

    #[tokio::test]
    async fn test_clearing_a_field_removes_it_from_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        let mut lyon = City::new("Lyon", 513_275);
        lyon.nickname = Some("Gones".to_string());
        let id = template.save(&mut lyon).await.unwrap();

        lyon.nickname = None;
        template.save(&mut lyon).await.unwrap();

        let found: City = template.find_one(&id).await.unwrap().unwrap();
        assert_eq!(found.nickname, None);
        assert_eq!(found.population, 513_275);
    }

    #[tokio::test]
    async fn test_relate_requires_relationship_entity() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        let mut lyon = City::new("Lyon", 1);
        let mut paris = City::new("Paris", 2);
        template.save(&mut lyon).await.unwrap();
        template.save(&mut paris).await.unwrap();

        let mut not_a_road = City::new("Between", 0);
        assert!(matches!(
            template.relate(&lyon, &paris, &mut not_a_road).await,
            Err(DataAccessError::Mapping(MappingError::NotARelationship(_)))
        ));
        assert!(not_a_road.id.is_none());
    }

    #[tokio::test]
    async fn test_relate_rejects_unmanaged_relationship() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db").to_string_lossy().into_owned();
        let connection = Arc::new(GraphConnectionFactory::new(DatabaseConfig::embedded(path)));
        let mapping = Arc::new(MappingContext::new([EntityDescriptor::of::<City>()]).unwrap());
        let template = GraphTemplate::new(connection, mapping);

        let mut lyon = City::new("Lyon", 1);
        let mut paris = City::new("Paris", 2);
        template.save(&mut lyon).await.unwrap();
        template.save(&mut paris).await.unwrap();

        let mut road = Road { id: None, length_km: 465 };
        assert!(matches!(
            template.relate(&lyon, &paris, &mut road).await,
            Err(DataAccessError::Mapping(MappingError::UnknownEntity(_)))
        ));
    }

    #[tokio::test]
    async fn test_updating_unknown_id_reports_entity() {
        let dir = tempfile::tempdir().unwrap();
        let template = embedded_template(&dir);

        let mut ghost = City::new("Atlantis", 0);
        ghost.id = Some("missing".to_string());
        assert!(matches!(
            template.save(&mut ghost).await,
            Err(DataAccessError::EntityNotFound { label, .. }) if label == "City"
        ));
    }
}
