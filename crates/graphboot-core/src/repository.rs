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

//! Typed repositories

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::database::QueryParameter;
use crate::errors::DataAccessResult;
use crate::mapping::{GraphEntity, MappingError};
use crate::template::GraphTemplate;

/// Hands out a [`GraphRepository`] per managed entity type
#[derive(Debug, Clone)]
pub struct GraphRepositories {
    template: Arc<GraphTemplate>,
}

impl GraphRepositories {
    pub fn new(template: Arc<GraphTemplate>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &GraphTemplate {
        &self.template
    }

    /// Repository for `T`; fails when `T` is not in the mapping context
    pub fn repository<T: GraphEntity>(&self) -> Result<GraphRepository<T>, MappingError> {
        self.template.mapping().descriptor::<T>()?;
        Ok(GraphRepository {
            template: Arc::clone(&self.template),
            _entity: PhantomData,
        })
    }
}

/// CRUD operations for one entity type
pub struct GraphRepository<T> {
    template: Arc<GraphTemplate>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for GraphRepository<T> {
    fn clone(&self) -> Self {
        Self {
            template: Arc::clone(&self.template),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for GraphRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRepository")
            .field("entity", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: GraphEntity> GraphRepository<T> {
    pub async fn save(&self, entity: &mut T) -> DataAccessResult<String> {
        self.template.save(entity).await
    }

    pub async fn find_by_id(&self, id: &str) -> DataAccessResult<Option<T>> {
        self.template.find_one(id).await
    }

    pub async fn find_all(&self) -> DataAccessResult<Vec<T>> {
        self.template.find_all().await
    }

    pub async fn find_by(&self, properties: HashMap<String, QueryParameter>) -> DataAccessResult<Vec<T>> {
        self.template.find_by(properties).await
    }

    pub async fn exists_by_id(&self, id: &str) -> DataAccessResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    pub async fn count(&self) -> DataAccessResult<usize> {
        self.template.count::<T>().await
    }

    pub async fn delete_by_id(&self, id: &str) -> DataAccessResult<()> {
        self.template.delete::<T>(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use crate::mapping::tests::City;
    use crate::template::tests::embedded_template;

    #[derive(Debug, Serialize, Deserialize)]
    struct Person {
        name: String,
    }

    impl GraphEntity for Person {
        const LABEL: &'static str = "Person";

        fn id(&self) -> Option<&str> {
            None
        }

        fn set_id(&mut self, _id: String) {}
    }

    #[tokio::test]
    async fn test_repository_crud() {
        let dir = tempfile::tempdir().unwrap();
        let repositories = GraphRepositories::new(Arc::new(embedded_template(&dir)));
        let cities = repositories.repository::<City>().unwrap();

        let mut oslo = City::new("Oslo", 709_037);
        let id = cities.save(&mut oslo).await.unwrap();

        assert!(cities.exists_by_id(&id).await.unwrap());
        assert_eq!(cities.count().await.unwrap(), 1);
        assert_eq!(cities.find_all().await.unwrap(), vec![oslo]);

        cities.delete_by_id(&id).await.unwrap();
        assert!(!cities.exists_by_id(&id).await.unwrap());
        assert_eq!(cities.count().await.unwrap(), 0);
    }

    #[test]
    fn test_unmanaged_type_has_no_repository() {
        let dir = tempfile::tempdir().unwrap();
        let repositories = GraphRepositories::new(Arc::new(embedded_template(&dir)));

        assert!(matches!(
            repositories.repository::<Person>(),
            Err(MappingError::UnknownEntity(_))
        ));
    }
}
