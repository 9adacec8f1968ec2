//! Per-request orchestration: classify, route, execute, shape.

use sqlroute_common::{
    DbCredentials, HealthResponse, OperationKind, QueryResponse, Result, Strategy, Topology,
    TopologyConfig,
};
use sqlroute_metrics::{MetricsRegistry, MetricsSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::backend::Connector;
use crate::classifier::classify;
use crate::executor::QueryExecutor;
use crate::mysql::MySqlConnector;
use crate::prober::LatencyProber;
use crate::router::StrategyRouter;

/// Handles already-admitted queries.
///
/// The handler owns the immutable topology and credentials plus the
/// metrics registry. Nothing it holds is mutated by a request except the
/// metrics counters, which never feed back into routing.
pub struct QueryHandler {
    topology: Arc<Topology>,
    credentials: DbCredentials,
    router: StrategyRouter,
    executor: QueryExecutor,
    metrics: Arc<MetricsRegistry>,
}

impl QueryHandler {
    /// Creates a handler that talks to MySQL.
    pub fn mysql(config: &TopologyConfig, credentials: DbCredentials) -> Self {
        let connector = MySqlConnector::new(
            credentials.clone(),
            Duration::from_millis(config.connect_timeout_ms),
        );
        Self::with_connector(config, credentials, Arc::new(connector))
    }

    /// Creates a handler on top of an arbitrary backend.
    ///
    /// `connect_timeout_ms` bounds each latency probe step and
    /// `query_timeout_ms` bounds each executed statement.
    pub fn with_connector(
        config: &TopologyConfig,
        credentials: DbCredentials,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let prober = LatencyProber::new(
            Arc::clone(&connector),
            Duration::from_millis(config.connect_timeout_ms),
        )
        .with_metrics(Arc::clone(&metrics));

        Self {
            topology: Arc::new(config.topology()),
            credentials,
            router: StrategyRouter::new(prober),
            executor: QueryExecutor::new(connector, Duration::from_millis(config.query_timeout_ms)),
            metrics,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Runs one query end to end.
    ///
    /// # Errors
    ///
    /// - `NoWorkersAvailable` when a `random`/`custom` read has no workers
    /// - `DatabaseUnavailable` when the chosen node cannot be reached
    /// - `QueryExecutionFailed` with the engine's message otherwise
    pub async fn handle(&self, sql: &str, strategy: Strategy) -> Result<QueryResponse> {
        let start = Instant::now();
        let operation = classify(sql);

        let result = self.route_and_execute(sql, operation, strategy).await;

        let route = format!("{}/{}", strategy, operation);
        let latency_us = start.elapsed().as_micros() as u64;
        self.metrics.record_query(&route, latency_us, result.is_ok());

        if let Err(e) = &result {
            warn!("{} query failed: {}", route, e);
        }

        result
    }

    async fn route_and_execute(
        &self,
        sql: &str,
        operation: OperationKind,
        strategy: Strategy,
    ) -> Result<QueryResponse> {
        let decision = self.router.resolve(operation, strategy, &self.topology).await?;
        debug!(
            "Routing {} ({}) to {}: {}",
            operation, strategy, decision.target, decision.description
        );
        self.metrics.record_node_request(&decision.target.addr());

        let result = match operation {
            OperationKind::Read => self.executor.execute_read(sql, &decision.target).await?,
            OperationKind::Write => self.executor.execute_write(sql, &decision.target).await?,
        };

        Ok(QueryResponse {
            target: decision.description,
            result,
        })
    }

    /// Topology and login details, without the password.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            manager: self.topology.manager().to_node_addr(),
            workers: self
                .topology
                .workers()
                .iter()
                .map(|w| w.to_node_addr())
                .collect(),
            db_user: self.credentials.user.clone(),
            db_name: self.credentials.database.clone(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
