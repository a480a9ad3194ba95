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

//! Embedded on-disk graph store backed by sled

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::config::DatabaseConfig;
use super::traits::{EdgeData, GraphDatabase, NodeData, QueryParameter, QueryResult, Transaction};
use super::types::{DatabaseError, DatabaseResult};

const NODES_TREE: &str = "nodes";
const EDGES_TREE: &str = "edges";

/// Embedded database stored at a local path
#[derive(Debug)]
pub struct EmbeddedDatabase {
    path: String,
    db: sled::Db,
    nodes: sled::Tree,
    edges: sled::Tree,
}

/// Embedded transaction; runs no statements, commit flushes the store to disk
pub struct EmbeddedTransaction {
    db: sled::Db,
}

fn encode<T: Serialize>(value: &T) -> DatabaseResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DatabaseResult<T> {
    Ok(bincode::deserialize(bytes)?)
}

fn matches_properties(
    properties: &HashMap<String, QueryParameter>,
    filter: &HashMap<String, QueryParameter>,
) -> bool {
    filter
        .iter()
        .all(|(key, value)| properties.get(key) == Some(value))
}

impl EmbeddedDatabase {
    /// Open (or create) the store at the configured path
    pub async fn new(config: DatabaseConfig) -> DatabaseResult<Self> {
        let db = sled::open(&config.uri)?;
        let nodes = db.open_tree(NODES_TREE)?;
        let edges = db.open_tree(EDGES_TREE)?;

        info!(path = %config.uri, recovered = db.was_recovered(), "Opened embedded graph store");

        Ok(Self {
            path: config.uri,
            db,
            nodes,
            edges,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn load_node(&self, id: &str) -> DatabaseResult<Option<NodeData>> {
        match self.nodes.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_edge(&self, id: &str) -> DatabaseResult<Option<EdgeData>> {
        match self.edges.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn all_edges(&self) -> DatabaseResult<Vec<EdgeData>> {
        let mut edges = Vec::new();
        for entry in self.edges.iter() {
            let (_, bytes) = entry?;
            edges.push(decode::<EdgeData>(&bytes)?);
        }
        Ok(edges)
    }
}

#[async_trait]
impl GraphDatabase for EmbeddedDatabase {
    async fn execute(
        &self,
        query: &str,
        _parameters: HashMap<String, QueryParameter>,
    ) -> DatabaseResult<QueryResult> {
        // Only the liveness probe is understood; there is no query language here
        if query.trim().eq_ignore_ascii_case("RETURN 1 AS health") {
            let mut row = HashMap::new();
            row.insert("health".to_string(), QueryParameter::Integer(1));
            return Ok(QueryResult {
                columns: vec!["health".to_string()],
                rows: vec![row],
            });
        }

        Err(DatabaseError::UnsupportedOperation(format!(
            "embedded store does not execute queries: {}",
            query
        )))
    }

    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn Transaction>> {
        Ok(Box::new(EmbeddedTransaction {
            db: self.db.clone(),
        }))
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.db.flush_async().await?;
        debug!(path = %self.path, "Flushed embedded graph store");
        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(self.db.size_on_disk().is_ok())
    }

    async fn create_node(
        &self,
        labels: Vec<String>,
        properties: HashMap<String, QueryParameter>,
    ) -> DatabaseResult<String> {
        let uuid = Uuid::new_v4().to_string();
        let node = NodeData {
            id: uuid.clone(),
            labels,
            properties,
        };

        self.nodes.insert(uuid.as_bytes(), encode(&node)?)?;
        Ok(uuid)
    }

    async fn get_node(&self, id: &str) -> DatabaseResult<Option<NodeData>> {
        self.load_node(id)
    }

    async fn update_node(
        &self,
        id: &str,
        properties: HashMap<String, QueryParameter>,
    ) -> DatabaseResult<()> {
        let mut node = self
            .load_node(id)?
            .ok_or_else(|| DatabaseError::NotFound(format!("Node with id {} not found", id)))?;

        node.properties.extend(properties);
        self.nodes.insert(id.as_bytes(), encode(&node)?)?;
        Ok(())
    }

    async fn replace_node(
        &self,
        id: &str,
        properties: HashMap<String, QueryParameter>,
    ) -> DatabaseResult<()> {
        let mut node = self
            .load_node(id)?
            .ok_or_else(|| DatabaseError::NotFound(format!("Node with id {} not found", id)))?;

        node.properties = properties;
        self.nodes.insert(id.as_bytes(), encode(&node)?)?;
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> DatabaseResult<()> {
        if self.nodes.remove(id.as_bytes())?.is_none() {
            return Err(DatabaseError::NotFound(format!(
                "Node with id {} not found",
                id
            )));
        }

        // Detach: drop every edge touching the node
        for edge in self.all_edges()? {
            if edge.source_id == id || edge.target_id == id {
                self.edges.remove(edge.id.as_bytes())?;
            }
        }

        Ok(())
    }

    async fn find_nodes(
        &self,
        label: Option<&str>,
        properties: HashMap<String, QueryParameter>,
    ) -> DatabaseResult<Vec<NodeData>> {
        let mut results = Vec::new();

        for entry in self.nodes.iter() {
            let (_, bytes) = entry?;
            let node: NodeData = decode(&bytes)?;

            if let Some(required_label) = label {
                if !node.labels.iter().any(|l| l == required_label) {
                    continue;
                }
            }

            if matches_properties(&node.properties, &properties) {
                results.push(node);
            }
        }

        Ok(results)
    }

    async fn create_edge(
        &self,
        source_id: &str,
        target_id: &str,
        edge_type: &str,
        properties: HashMap<String, QueryParameter>,
    ) -> DatabaseResult<String> {
        if !self.nodes.contains_key(source_id.as_bytes())? {
            return Err(DatabaseError::NotFound(format!(
                "Source node {} not found",
                source_id
            )));
        }
        if !self.nodes.contains_key(target_id.as_bytes())? {
            return Err(DatabaseError::NotFound(format!(
                "Target node {} not found",
                target_id
            )));
        }

        let uuid = Uuid::new_v4().to_string();
        let edge = EdgeData {
            id: uuid.clone(),
            relationship_type: edge_type.to_string(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            properties,
        };

        self.edges.insert(uuid.as_bytes(), encode(&edge)?)?;
        Ok(uuid)
    }

    async fn get_edge(&self, id: &str) -> DatabaseResult<Option<EdgeData>> {
        self.load_edge(id)
    }

    async fn delete_edge(&self, id: &str) -> DatabaseResult<()> {
        if self.edges.remove(id.as_bytes())?.is_none() {
            return Err(DatabaseError::NotFound(format!(
                "Edge with id {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn find_edges(
        &self,
        source_id: Option<&str>,
        target_id: Option<&str>,
        edge_type: Option<&str>,
    ) -> DatabaseResult<Vec<EdgeData>> {
        Ok(self
            .all_edges()?
            .into_iter()
            .filter(|edge| source_id.map_or(true, |src| edge.source_id == src))
            .filter(|edge| target_id.map_or(true, |tgt| edge.target_id == tgt))
            .filter(|edge| edge_type.map_or(true, |typ| edge.relationship_type == typ))
            .collect())
    }

    async fn clear_database(&self) -> DatabaseResult<()> {
        self.nodes.clear()?;
        self.edges.clear()?;
        Ok(())
    }
}

#[async_trait]
impl Transaction for EmbeddedTransaction {
    async fn execute(
        &mut self,
        query: &str,
        _parameters: HashMap<String, QueryParameter>,
    ) -> DatabaseResult<QueryResult> {
        Err(DatabaseError::UnsupportedOperation(format!(
            "embedded store does not execute queries: {}",
            query
        )))
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DatabaseResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_store(dir: &tempfile::TempDir) -> EmbeddedDatabase {
        let path = dir.path().join("graph.db");
        EmbeddedDatabase::new(DatabaseConfig::embedded(path.to_string_lossy().to_string()))
            .await
            .unwrap()
    }

    fn props(pairs: &[(&str, QueryParameter)]) -> HashMap<String, QueryParameter> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_node_lifecycle() {
        let dir = tempdir().unwrap();
        let db = open_store(&dir).await;

        let id = db
            .create_node(
                vec!["City".to_string()],
                props(&[("name", QueryParameter::from("Oslo"))]),
            )
            .await
            .unwrap();

        let node = db.get_node(&id).await.unwrap().unwrap();
        assert_eq!(node.labels, vec!["City".to_string()]);
        assert_eq!(node.properties.get("name"), Some(&QueryParameter::from("Oslo")));

        db.update_node(&id, props(&[("country", QueryParameter::from("NO"))]))
            .await
            .unwrap();
        let node = db.get_node(&id).await.unwrap().unwrap();
        assert_eq!(node.properties.len(), 2);

        db.replace_node(&id, props(&[("name", QueryParameter::from("Bergen"))]))
            .await
            .unwrap();
        let node = db.get_node(&id).await.unwrap().unwrap();
        assert_eq!(node.properties.len(), 1);
        assert!(!node.properties.contains_key("country"));

        db.delete_node(&id).await.unwrap();
        assert!(db.get_node(&id).await.unwrap().is_none());
        assert!(matches!(
            db.delete_node(&id).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_nodes_filters_by_label_and_properties() {
        let dir = tempdir().unwrap();
        let db = open_store(&dir).await;

        db.create_node(vec!["City".to_string()], props(&[("country", QueryParameter::from("NO"))]))
            .await
            .unwrap();
        db.create_node(vec!["City".to_string()], props(&[("country", QueryParameter::from("SE"))]))
            .await
            .unwrap();
        db.create_node(vec!["Person".to_string()], props(&[("country", QueryParameter::from("NO"))]))
            .await
            .unwrap();

        let cities = db.find_nodes(Some("City"), HashMap::new()).await.unwrap();
        assert_eq!(cities.len(), 2);

        let norwegian_cities = db
            .find_nodes(Some("City"), props(&[("country", QueryParameter::from("NO"))]))
            .await
            .unwrap();
        assert_eq!(norwegian_cities.len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_node_detaches_edges() {
        let dir = tempdir().unwrap();
        let db = open_store(&dir).await;

        let a = db.create_node(vec!["City".to_string()], HashMap::new()).await.unwrap();
        let b = db.create_node(vec!["City".to_string()], HashMap::new()).await.unwrap();
        let edge = db.create_edge(&a, &b, "ROAD", HashMap::new()).await.unwrap();

        assert_eq!(db.find_edges(Some(&a), None, None).await.unwrap().len(), 1);
        assert_eq!(db.get_edge(&edge).await.unwrap().unwrap().relationship_type, "ROAD");

        db.delete_node(&a).await.unwrap();
        assert!(db.get_edge(&edge).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_edge_requires_existing_nodes() {
        let dir = tempdir().unwrap();
        let db = open_store(&dir).await;

        let a = db.create_node(vec!["City".to_string()], HashMap::new()).await.unwrap();
        let result = db.create_edge(&a, "missing", "ROAD", HashMap::new()).await;
        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_only_health_query_is_supported() {
        let dir = tempdir().unwrap();
        let db = open_store(&dir).await;

        let result = db.execute("RETURN 1 AS health", HashMap::new()).await.unwrap();
        assert_eq!(result.rows.len(), 1);
        assert!(db.health_check().await.unwrap());

        let result = db.execute("MATCH (n) RETURN n", HashMap::new()).await;
        assert!(matches!(result, Err(DatabaseError::UnsupportedOperation(_))));
    }
}
