//! Runs a classified query on its target node.

use sqlroute_common::{Node, QueryResult, Result, SqlrouteError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::backend::{Connector, Session};

/// Executes statements on a fresh connection per call.
///
/// The connection is closed on every exit path, including statement
/// failures and timeouts. There are no retries.
pub struct QueryExecutor {
    connector: Arc<dyn Connector>,
    query_timeout: Duration,
}

impl QueryExecutor {
    /// Creates an executor.
    ///
    /// # Arguments
    /// * `connector` - Backend used to open connections
    /// * `query_timeout` - Bound on a single statement once connected
    pub fn new(connector: Arc<dyn Connector>, query_timeout: Duration) -> Self {
        Self {
            connector,
            query_timeout,
        }
    }

    /// Runs `sql` as a read: column names, every row, and the row count.
    ///
    /// Column names are reported even when no rows match.
    pub async fn execute_read(&self, sql: &str, node: &Node) -> Result<QueryResult> {
        let mut session = self.connector.connect(node).await?;
        let outcome = self.bounded(node, session.query(sql)).await;
        release(session, node).await;

        let outcome = outcome?;
        Ok(QueryResult::read(outcome.columns, outcome.rows))
    }

    /// Runs `sql` as a single autocommitted statement and reports the
    /// affected-row count.
    pub async fn execute_write(&self, sql: &str, node: &Node) -> Result<QueryResult> {
        let mut session = self.connector.connect(node).await?;
        let affected = self.bounded(node, session.execute(sql)).await;
        release(session, node).await;

        Ok(QueryResult::write(affected?))
    }

    async fn bounded<T>(
        &self,
        node: &Node,
        statement: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.query_timeout, statement)
            .await
            .map_err(|_| {
                SqlrouteError::DatabaseUnavailable(format!(
                    "Query on {} timed out after {}ms",
                    node,
                    self.query_timeout.as_millis()
                ))
            })?
    }
}

async fn release(session: Box<dyn Session>, node: &Node) {
    if let Err(e) = session.close().await {
        warn!("Failed to close connection to {}: {}", node, e);
    }
}
