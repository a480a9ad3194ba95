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

//! Neo4j database implementation

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use neo4rs::{query, BoltList, BoltMap, BoltType, ConfigBuilder, Graph, Query, Txn};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::traits::{GraphDatabase, Transaction, QueryResult, QueryParameter, NodeData, EdgeData};
use super::config::DatabaseConfig;
use super::types::{DatabaseResult, DatabaseError};

const NODE_PROJECTION: &str = "n.uuid AS id, labels(n) AS labels, properties(n) AS properties";
const EDGE_PROJECTION: &str =
    "r.uuid AS id, type(r) AS type, a.uuid AS source, b.uuid AS target, properties(r) AS properties";

/// Neo4j database implementation
pub struct Neo4jDatabase {
    graph: Arc<Graph>,
}

impl std::fmt::Debug for Neo4jDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jDatabase").finish_non_exhaustive()
    }
}

/// Neo4j transaction wrapper
pub struct Neo4jTransaction {
    txn: Txn,
}

/// Labels and relationship types are spliced into Cypher text, so only plain identifiers pass
fn check_identifier(name: &str) -> DatabaseResult<&str> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidParameter(format!("Invalid identifier: {}", name)))
    }
}

fn take_string(row: &mut HashMap<String, QueryParameter>, key: &str) -> DatabaseResult<String> {
    match row.remove(key) {
        Some(QueryParameter::String(s)) => Ok(s),
        other => Err(DatabaseError::Serialization(format!(
            "expected string column '{}', got {:?}",
            key, other
        ))),
    }
}

fn take_map(row: &mut HashMap<String, QueryParameter>, key: &str) -> HashMap<String, QueryParameter> {
    match row.remove(key) {
        Some(QueryParameter::Map(map)) => map,
        _ => HashMap::new(),
    }
}

fn row_to_node(mut row: HashMap<String, QueryParameter>) -> DatabaseResult<NodeData> {
    let id = take_string(&mut row, "id")?;
    let labels = match row.remove("labels") {
        Some(QueryParameter::List(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                QueryParameter::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    let mut properties = take_map(&mut row, "properties");
    properties.remove("uuid");

    Ok(NodeData { id, labels, properties })
}

fn row_to_edge(mut row: HashMap<String, QueryParameter>) -> DatabaseResult<EdgeData> {
    let mut properties = take_map(&mut row, "properties");
    properties.remove("uuid");

    Ok(EdgeData {
        id: take_string(&mut row, "id")?,
        relationship_type: take_string(&mut row, "type")?,
        source_id: take_string(&mut row, "source")?,
        target_id: take_string(&mut row, "target")?,
        properties,
    })
}

impl Neo4jDatabase {
    /// Create a new Neo4j database connection
    pub async fn new(config: DatabaseConfig) -> DatabaseResult<Self> {
        let mut builder = ConfigBuilder::default().uri(&config.uri);

        builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => builder.user(username).password(password.as_str()),
            (Some(username), None) => builder.user(username).password(""),
            _ => builder.user("").password(""),
        };

        let graph = Graph::connect(builder.build()?).await?;
        info!(uri = %config.uri, credentialed = config.has_credentials(), "Connected to Neo4j");

        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Underlying driver handle
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Convert QueryParameter to BoltType for Neo4j
    fn param_to_bolt(param: &QueryParameter) -> BoltType {
        match param {
            QueryParameter::String(s) => BoltType::String(neo4rs::BoltString::new(s)),
            QueryParameter::Integer(i) => BoltType::Integer(neo4rs::BoltInteger::new(*i)),
            QueryParameter::Float(f) => BoltType::Float(neo4rs::BoltFloat::new(*f)),
            QueryParameter::Boolean(b) => BoltType::Boolean(neo4rs::BoltBoolean::new(*b)),
            QueryParameter::Null => BoltType::Null(neo4rs::BoltNull),
            QueryParameter::List(list) => {
                let mut bolt_list = BoltList::new();
                for item in list {
                    bolt_list.push(Self::param_to_bolt(item));
                }
                BoltType::List(bolt_list)
            }
            QueryParameter::Map(map) => {
                let mut bolt_map = BoltMap::new();
                for (key, value) in map {
                    bolt_map.put(neo4rs::BoltString::new(key), Self::param_to_bolt(value));
                }
                BoltType::Map(bolt_map)
            }
        }
    }

    fn build_query(statement: &str, parameters: &HashMap<String, QueryParameter>) -> Query {
        parameters
            .iter()
            .fold(query(statement), |q, (key, value)| {
                q.param(key, Self::param_to_bolt(value))
            })
    }

    /// Execute a query and convert every row into parameter maps
    #[instrument(skip(self, parameters))]
    async fn execute_query(&self, statement: &str, parameters: HashMap<String, QueryParameter>) -> DatabaseResult<QueryResult> {
        let mut stream = self.graph.execute(Self::build_query(statement, &parameters)).await?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let values: HashMap<String, serde_json::Value> = row
                .to()
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
            rows.push(
                values
                    .into_iter()
                    .map(|(key, value)| (key, QueryParameter::from(value)))
                    .collect::<HashMap<_, _>>(),
            );
        }

        let mut columns: Vec<String> = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        columns.sort();

        debug!(rows = rows.len(), "Query completed");
        Ok(QueryResult { columns, rows })
    }

    fn id_params(id: &str) -> HashMap<String, QueryParameter> {
        let mut params = HashMap::new();
        params.insert("id".to_string(), QueryParameter::String(id.to_string()));
        params
    }
}

#[async_trait]
impl GraphDatabase for Neo4jDatabase {
    async fn execute(&self, query: &str, parameters: HashMap<String, QueryParameter>) -> DatabaseResult<QueryResult> {
        self.execute_query(query, parameters).await
    }

    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn Transaction>> {
        let txn = self.graph.start_txn().await?;
        Ok(Box::new(Neo4jTransaction { txn }))
    }

    async fn close(&self) -> DatabaseResult<()> {
        // The driver releases pooled connections on drop
        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.execute("RETURN 1 AS health", HashMap::new()).await?;
        Ok(!result.rows.is_empty())
    }

    async fn create_node(&self, labels: Vec<String>, properties: HashMap<String, QueryParameter>) -> DatabaseResult<String> {
        let labels = labels
            .iter()
            .map(|label| check_identifier(label))
            .collect::<DatabaseResult<Vec<_>>>()?;
        let uuid = Uuid::new_v4().to_string();
        let statement = format!(
            "CREATE (n:{}) SET n += $props SET n.uuid = $uuid RETURN n.uuid AS id",
            labels.join(":")
        );

        let mut params = HashMap::new();
        params.insert("uuid".to_string(), QueryParameter::String(uuid.clone()));
        params.insert("props".to_string(), QueryParameter::Map(properties));

        self.execute(&statement, params).await?;
        Ok(uuid)
    }

    async fn get_node(&self, id: &str) -> DatabaseResult<Option<NodeData>> {
        let statement = format!("MATCH (n {{uuid: $id}}) RETURN {}", NODE_PROJECTION);
        let result = self.execute(&statement, Self::id_params(id)).await?;
        result.rows.into_iter().next().map(row_to_node).transpose()
    }

    async fn update_node(&self, id: &str, properties: HashMap<String, QueryParameter>) -> DatabaseResult<()> {
        let statement = "MATCH (n {uuid: $id}) SET n += $props RETURN n.uuid AS id";
        let mut params = Self::id_params(id);
        params.insert("props".to_string(), QueryParameter::Map(properties));

        let result = self.execute(statement, params).await?;
        if result.rows.is_empty() {
            return Err(DatabaseError::NotFound(format!("Node with id {} not found", id)));
        }
        Ok(())
    }

    async fn replace_node(&self, id: &str, properties: HashMap<String, QueryParameter>) -> DatabaseResult<()> {
        let statement = "MATCH (n {uuid: $id}) SET n = $props SET n.uuid = $id RETURN n.uuid AS id";
        let mut params = Self::id_params(id);
        params.insert("props".to_string(), QueryParameter::Map(properties));

        let result = self.execute(statement, params).await?;
        if result.rows.is_empty() {
            return Err(DatabaseError::NotFound(format!("Node with id {} not found", id)));
        }
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> DatabaseResult<()> {
        let statement = "MATCH (n {uuid: $id}) DETACH DELETE n RETURN count(n) AS deleted";
        let result = self.execute(statement, Self::id_params(id)).await?;
        let deleted = result
            .rows
            .first()
            .and_then(|row| row.get("deleted"))
            .cloned();
        if deleted == Some(QueryParameter::Integer(0)) {
            return Err(DatabaseError::NotFound(format!("Node with id {} not found", id)));
        }
        Ok(())
    }

    async fn find_nodes(&self, label: Option<&str>, properties: HashMap<String, QueryParameter>) -> DatabaseResult<Vec<NodeData>> {
        let label_part = match label {
            Some(l) => format!(":{}", check_identifier(l)?),
            None => String::new(),
        };

        let statement = format!(
            "MATCH (n{}) WHERE all(key IN keys($props) WHERE n[key] = $props[key]) RETURN {}",
            label_part, NODE_PROJECTION
        );
        let mut params = HashMap::new();
        params.insert("props".to_string(), QueryParameter::Map(properties));

        let result = self.execute(&statement, params).await?;
        result.rows.into_iter().map(row_to_node).collect()
    }

    async fn create_edge(&self, source_id: &str, target_id: &str, edge_type: &str, properties: HashMap<String, QueryParameter>) -> DatabaseResult<String> {
        let uuid = Uuid::new_v4().to_string();
        let statement = format!(
            "MATCH (a {{uuid: $source_id}}), (b {{uuid: $target_id}}) CREATE (a)-[r:{}]->(b) SET r += $props SET r.uuid = $uuid RETURN r.uuid AS id",
            check_identifier(edge_type)?
        );

        let mut params = HashMap::new();
        params.insert("source_id".to_string(), QueryParameter::String(source_id.to_string()));
        params.insert("target_id".to_string(), QueryParameter::String(target_id.to_string()));
        params.insert("uuid".to_string(), QueryParameter::String(uuid.clone()));
        params.insert("props".to_string(), QueryParameter::Map(properties));

        let result = self.execute(&statement, params).await?;
        if result.rows.is_empty() {
            return Err(DatabaseError::NotFound(format!(
                "Nodes {} and {} must both exist",
                source_id, target_id
            )));
        }
        Ok(uuid)
    }

    async fn get_edge(&self, id: &str) -> DatabaseResult<Option<EdgeData>> {
        let statement = format!("MATCH (a)-[r {{uuid: $id}}]->(b) RETURN {}", EDGE_PROJECTION);
        let result = self.execute(&statement, Self::id_params(id)).await?;
        result.rows.into_iter().next().map(row_to_edge).transpose()
    }

    async fn delete_edge(&self, id: &str) -> DatabaseResult<()> {
        let statement = "MATCH ()-[r {uuid: $id}]->() DELETE r RETURN count(r) AS deleted";
        let result = self.execute(statement, Self::id_params(id)).await?;
        let deleted = result
            .rows
            .first()
            .and_then(|row| row.get("deleted"))
            .cloned();
        if deleted == Some(QueryParameter::Integer(0)) {
            return Err(DatabaseError::NotFound(format!("Edge with id {} not found", id)));
        }
        Ok(())
    }

    async fn find_edges(&self, source_id: Option<&str>, target_id: Option<&str>, edge_type: Option<&str>) -> DatabaseResult<Vec<EdgeData>> {
        let type_part = match edge_type {
            Some(t) => format!(":{}", check_identifier(t)?),
            None => String::new(),
        };

        let statement = format!(
            "MATCH (a)-[r{}]->(b) WHERE ($source IS NULL OR a.uuid = $source) AND ($target IS NULL OR b.uuid = $target) RETURN {}",
            type_part, EDGE_PROJECTION
        );
        let optional = |value: Option<&str>| {
            value.map_or(QueryParameter::Null, |v| QueryParameter::String(v.to_string()))
        };
        let mut params = HashMap::new();
        params.insert("source".to_string(), optional(source_id));
        params.insert("target".to_string(), optional(target_id));

        let result = self.execute(&statement, params).await?;
        result.rows.into_iter().map(row_to_edge).collect()
    }

    async fn clear_database(&self) -> DatabaseResult<()> {
        self.execute("MATCH (n) DETACH DELETE n", HashMap::new()).await?;
        Ok(())
    }
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    /// Statements run inside a transaction do not stream rows back
    async fn execute(&mut self, statement: &str, parameters: HashMap<String, QueryParameter>) -> DatabaseResult<QueryResult> {
        self.txn
            .run(Neo4jDatabase::build_query(statement, &parameters))
            .await?;
        Ok(QueryResult::default())
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        let Self { txn } = *self;
        txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DatabaseResult<()> {
        let Self { txn } = *self;
        txn.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_check_rejects_injection() {
        assert!(check_identifier("City").is_ok());
        assert!(check_identifier("HAS_ROAD").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("1City").is_err());
        assert!(check_identifier("City) DETACH DELETE (m").is_err());
    }

    #[test]
    fn test_row_to_node_strips_uuid_property() {
        let mut properties = HashMap::new();
        properties.insert("uuid".to_string(), QueryParameter::from("abc"));
        properties.insert("name".to_string(), QueryParameter::from("Oslo"));

        let mut row = HashMap::new();
        row.insert("id".to_string(), QueryParameter::from("abc"));
        row.insert(
            "labels".to_string(),
            QueryParameter::List(vec![QueryParameter::from("City")]),
        );
        row.insert("properties".to_string(), QueryParameter::Map(properties));

        let node = row_to_node(row).unwrap();
        assert_eq!(node.id, "abc");
        assert_eq!(node.labels, vec!["City".to_string()]);
        assert_eq!(node.properties.len(), 1);
        assert!(node.properties.contains_key("name"));
    }

    #[test]
    fn test_row_to_edge_requires_endpoints() {
        let mut row = HashMap::new();
        row.insert("id".to_string(), QueryParameter::from("r1"));
        row.insert("type".to_string(), QueryParameter::from("ROAD"));
        row.insert("source".to_string(), QueryParameter::from("a"));

        assert!(matches!(
            row_to_edge(row),
            Err(DatabaseError::Serialization(_))
        ));
    }
}
