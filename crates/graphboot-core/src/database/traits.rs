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

//! Database abstraction traits

use std::collections::HashMap;
use std::fmt::Debug;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::DatabaseResult;

/// Represents a query parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryParameter {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    List(Vec<QueryParameter>),
    Map(HashMap<String, QueryParameter>),
}

impl From<serde_json::Value> for QueryParameter {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => QueryParameter::Null,
            serde_json::Value::Bool(b) => QueryParameter::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => QueryParameter::Integer(i),
                None => QueryParameter::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => QueryParameter::String(s),
            serde_json::Value::Array(items) => {
                QueryParameter::List(items.into_iter().map(QueryParameter::from).collect())
            }
            serde_json::Value::Object(map) => QueryParameter::Map(
                map.into_iter()
                    .map(|(key, value)| (key, QueryParameter::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<QueryParameter> for serde_json::Value {
    fn from(param: QueryParameter) -> Self {
        match param {
            QueryParameter::Null => serde_json::Value::Null,
            QueryParameter::Boolean(b) => serde_json::Value::Bool(b),
            QueryParameter::Integer(i) => serde_json::Value::from(i),
            QueryParameter::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            QueryParameter::String(s) => serde_json::Value::String(s),
            QueryParameter::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            QueryParameter::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, serde_json::Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for QueryParameter {
    fn from(value: &str) -> Self {
        QueryParameter::String(value.to_string())
    }
}

impl From<String> for QueryParameter {
    fn from(value: String) -> Self {
        QueryParameter::String(value)
    }
}

impl From<i64> for QueryParameter {
    fn from(value: i64) -> Self {
        QueryParameter::Integer(value)
    }
}

impl From<bool> for QueryParameter {
    fn from(value: bool) -> Self {
        QueryParameter::Boolean(value)
    }
}

/// Represents node data returned from queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: HashMap<String, QueryParameter>,
}

/// Represents edge/relationship data returned from queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub id: String,
    pub relationship_type: String,
    pub source_id: String,
    pub target_id: String,
    pub properties: HashMap<String, QueryParameter>,
}

/// Represents a query result row
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, QueryParameter>>,
}

/// Transaction interface for database operations
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Execute a query within the transaction
    async fn execute(&mut self, query: &str, parameters: HashMap<String, QueryParameter>) -> DatabaseResult<QueryResult>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> DatabaseResult<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> DatabaseResult<()>;
}

/// Main database trait that abstracts graph database operations
#[async_trait]
pub trait GraphDatabase: Send + Sync + Debug {
    /// Execute a query and return results
    async fn execute(&self, query: &str, parameters: HashMap<String, QueryParameter>) -> DatabaseResult<QueryResult>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn Transaction>>;

    /// Close the database connection
    async fn close(&self) -> DatabaseResult<()>;

    /// Check if the database connection is healthy
    async fn health_check(&self) -> DatabaseResult<bool>;

    // Node operations
    async fn create_node(&self, labels: Vec<String>, properties: HashMap<String, QueryParameter>) -> DatabaseResult<String>;
    async fn get_node(&self, id: &str) -> DatabaseResult<Option<NodeData>>;
    async fn update_node(&self, id: &str, properties: HashMap<String, QueryParameter>) -> DatabaseResult<()>;
    /// Overwrite the node's whole property map; keys absent from `properties` are removed
    async fn replace_node(&self, id: &str, properties: HashMap<String, QueryParameter>) -> DatabaseResult<()>;
    async fn delete_node(&self, id: &str) -> DatabaseResult<()>;
    async fn find_nodes(&self, label: Option<&str>, properties: HashMap<String, QueryParameter>) -> DatabaseResult<Vec<NodeData>>;

    // Edge operations
    async fn create_edge(&self, source_id: &str, target_id: &str, edge_type: &str, properties: HashMap<String, QueryParameter>) -> DatabaseResult<String>;
    async fn get_edge(&self, id: &str) -> DatabaseResult<Option<EdgeData>>;
    async fn delete_edge(&self, id: &str) -> DatabaseResult<()>;
    async fn find_edges(&self, source_id: Option<&str>, target_id: Option<&str>, edge_type: Option<&str>) -> DatabaseResult<Vec<EdgeData>>;

    // Graph operations
    async fn clear_database(&self) -> DatabaseResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_keeps_structure() {
        let value = json!({
            "name": "Lyon",
            "population": 513275,
            "area": 47.87,
            "capital": false,
            "districts": ["1er", "2e"],
            "mayor": null
        });

        let param = QueryParameter::from(value.clone());
        match &param {
            QueryParameter::Map(map) => {
                assert_eq!(map.get("population"), Some(&QueryParameter::Integer(513275)));
                assert_eq!(map.get("area"), Some(&QueryParameter::Float(47.87)));
                assert_eq!(map.get("mayor"), Some(&QueryParameter::Null));
            }
            other => panic!("expected map, got {:?}", other),
        }

        assert_eq!(serde_json::Value::from(param), value);
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        let value = serde_json::Value::from(QueryParameter::Float(f64::NAN));
        assert!(value.is_null());
    }
}
