//! Active latency probing of worker nodes.

use sqlroute_common::{Node, Result, SqlrouteError};
use sqlroute_metrics::MetricsRegistry;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::backend::Connector;

/// Query used to measure a round trip.
pub const PROBE_SQL: &str = "SELECT 1";

/// Outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    Measured(Duration),
    Unreachable,
}

impl Latency {
    /// Milliseconds, with `Unreachable` as positive infinity.
    pub fn as_millis_f64(&self) -> f64 {
        match self {
            Latency::Measured(d) => d.as_secs_f64() * 1000.0,
            Latency::Unreachable => f64::INFINITY,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Latency::Measured(_))
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Latency::Measured(_) => write!(f, "{:.1}ms", self.as_millis_f64()),
            Latency::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// One node's probe result. Computed fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyMeasurement {
    pub node: Node,
    pub latency: Latency,
}

/// Measures connect + `SELECT 1` round trips.
pub struct LatencyProber {
    connector: Arc<dyn Connector>,
    timeout: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl LatencyProber {
    /// Creates a prober.
    ///
    /// # Arguments
    /// * `connector` - Backend used to open probe connections
    /// * `timeout` - Bound on the connect and on the probe query, each
    pub fn new(connector: Arc<dyn Connector>, timeout: Duration) -> Self {
        Self {
            connector,
            timeout,
            metrics: None,
        }
    }

    /// Counts probes and unreachable probes in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Probes a single node.
    ///
    /// Elapsed time runs from the start of the connect to the arrival of the
    /// `SELECT 1` row. Any failure (timeout, refusal, auth, query error)
    /// yields [`Latency::Unreachable`]; this never returns an error.
    pub async fn probe(&self, node: &Node) -> LatencyMeasurement {
        let latency = match self.round_trip(node).await {
            Ok(elapsed) => Latency::Measured(elapsed),
            Err(e) => {
                warn!("Latency probe to {} failed: {}", node, e);
                Latency::Unreachable
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_probe(latency.is_reachable());
        }

        LatencyMeasurement {
            node: node.clone(),
            latency,
        }
    }

    /// Probes every node concurrently. Results are in the order of `nodes`,
    /// whatever order the probes complete in.
    pub async fn probe_all(&self, nodes: &[Node]) -> Vec<LatencyMeasurement> {
        let probes = nodes.iter().map(|node| self.probe(node));
        futures::future::join_all(probes).await
    }

    async fn round_trip(&self, node: &Node) -> Result<Duration> {
        let start = Instant::now();

        let mut session = tokio::time::timeout(self.timeout, self.connector.connect(node))
            .await
            .map_err(|_| self.timeout_error(node))??;

        let outcome = tokio::time::timeout(self.timeout, session.query(PROBE_SQL)).await;
        let elapsed = start.elapsed();

        if let Err(e) = session.close().await {
            warn!("Failed to close probe connection to {}: {}", node, e);
        }

        let result = outcome.map_err(|_| self.timeout_error(node))??;
        if result.rows.is_empty() {
            return Err(SqlrouteError::QueryExecutionFailed(format!(
                "{} returned no rows",
                PROBE_SQL
            )));
        }

        Ok(elapsed)
    }

    fn timeout_error(&self, node: &Node) -> SqlrouteError {
        SqlrouteError::DatabaseUnavailable(format!(
            "Probe to {} timed out after {}ms",
            node,
            self.timeout.as_millis()
        ))
    }
}
