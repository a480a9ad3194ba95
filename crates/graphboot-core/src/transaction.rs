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

//! Transaction manager

use std::sync::Arc;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::database::Transaction;
use crate::errors::{DataAccessError, DataAccessResult};
use crate::template::GraphTemplate;

/// Runs units of work inside database transactions
#[derive(Debug, Clone)]
pub struct GraphTransactionManager {
    template: Arc<GraphTemplate>,
}

impl GraphTransactionManager {
    pub fn new(template: Arc<GraphTemplate>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &GraphTemplate {
        &self.template
    }

    /// Open a transaction the caller commits or rolls back
    pub async fn begin(&self) -> DataAccessResult<Box<dyn Transaction>> {
        let database = self.template.database().await?;
        database
            .begin_transaction()
            .await
            .map_err(|e| DataAccessError::Transaction {
                message: e.to_string(),
            })
    }

    /// Run `work` in a fresh transaction
    ///
    /// Commits when `work` succeeds and rolls back when it fails. A failed
    /// rollback is logged; the error from `work` is what the caller sees.
    pub async fn execute<T, F>(&self, work: F) -> DataAccessResult<T>
    where
        F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, DataAccessResult<T>>,
    {
        let mut txn = self.begin().await?;

        match work(txn.as_mut()).await {
            Ok(value) => {
                txn.commit().await.map_err(|e| DataAccessError::Transaction {
                    message: e.to_string(),
                })?;
                debug!("Transaction committed");
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                debug!(%error, "Transaction rolled back");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::database::DatabaseError;
    use crate::mapping::tests::City;
    use crate::template::tests::embedded_template;

    #[tokio::test]
    async fn test_commits_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let template = Arc::new(embedded_template(&dir));
        let manager = GraphTransactionManager::new(template.clone());

        let value = manager
            .execute(|_txn| Box::pin(async move { Ok::<_, DataAccessError>(7) }))
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_rolls_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let template = Arc::new(embedded_template(&dir));
        let manager = GraphTransactionManager::new(template.clone());

        let result: DataAccessResult<()> = manager
            .execute(|txn| {
                Box::pin(async move {
                    txn.execute("CREATE (n:City)", HashMap::new()).await?;
                    Ok::<_, DataAccessError>(())
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(DataAccessError::Database(DatabaseError::UnsupportedOperation(_)))
        ));
        assert_eq!(template.count::<City>().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_begin_returns_usable_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let manager = GraphTransactionManager::new(Arc::new(embedded_template(&dir)));

        let txn = manager.begin().await.unwrap();
        txn.rollback().await.unwrap();
        assert!(manager.template().is_connected());
    }
}
