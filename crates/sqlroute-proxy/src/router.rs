//! Strategy-based target selection.
//!
//! | strategy | write   | read                                           |
//! |----------|---------|------------------------------------------------|
//! | direct   | manager | manager                                        |
//! | random   | manager | uniform random worker                          |
//! | custom   | manager | lowest probed latency, random if none answered |
//!
//! Reads under `random` or `custom` never fall back to the manager: with no
//! workers configured they fail with `NoWorkersAvailable`.

use rand::seq::SliceRandom;
use sqlroute_common::{Node, OperationKind, Result, SqlrouteError, Strategy, Topology};
use tracing::warn;

use crate::prober::{LatencyMeasurement, LatencyProber};

/// The node chosen for one query and a human-readable account of why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub target: Node,
    /// `manager`, `worker(random) <host>`, `worker(custom,min-lat) <host> (<ms>ms)`
    /// or `worker(custom,fallback) <host>`.
    pub description: String,
}

impl RoutingDecision {
    fn manager(node: &Node) -> Self {
        Self {
            target: node.clone(),
            description: "manager".to_string(),
        }
    }
}

/// Resolves a single target node per query.
pub struct StrategyRouter {
    prober: LatencyProber,
}

impl StrategyRouter {
    pub fn new(prober: LatencyProber) -> Self {
        Self { prober }
    }

    /// Picks the node that executes a query.
    ///
    /// Only `custom` reads touch the network: every worker is probed once,
    /// concurrently, and nothing is remembered for the next request.
    ///
    /// # Errors
    ///
    /// `NoWorkersAvailable` for `random` or `custom` reads when the topology
    /// has no workers.
    pub async fn resolve(
        &self,
        operation: OperationKind,
        strategy: Strategy,
        topology: &Topology,
    ) -> Result<RoutingDecision> {
        match (strategy, operation) {
            (Strategy::Direct, _) | (_, OperationKind::Write) => {
                Ok(RoutingDecision::manager(topology.manager()))
            }
            (Strategy::Random, OperationKind::Read) => {
                let worker =
                    pick_random(topology.workers()).ok_or(SqlrouteError::NoWorkersAvailable)?;
                Ok(RoutingDecision {
                    target: worker.clone(),
                    description: format!("worker(random) {}", worker.host),
                })
            }
            (Strategy::Custom, OperationKind::Read) => {
                self.resolve_fastest(topology).await
            }
        }
    }

    async fn resolve_fastest(&self, topology: &Topology) -> Result<RoutingDecision> {
        if !topology.has_workers() {
            return Err(SqlrouteError::NoWorkersAvailable);
        }

        let workers = topology.workers();
        let measurements = self.prober.probe_all(workers).await;

        if let Some(index) = select_fastest(&measurements) {
            let fastest = &measurements[index];
            return Ok(RoutingDecision {
                target: fastest.node.clone(),
                description: format!(
                    "worker(custom,min-lat) {} ({:.1}ms)",
                    fastest.node.host,
                    fastest.latency.as_millis_f64()
                ),
            });
        }

        // Every probe failed. Still a worker, never the manager.
        let worker = pick_random(workers).ok_or(SqlrouteError::NoWorkersAvailable)?;
        warn!(
            "All {} workers unreachable, falling back to {}",
            workers.len(),
            worker
        );
        Ok(RoutingDecision {
            target: worker.clone(),
            description: format!("worker(custom,fallback) {}", worker.host),
        })
    }
}

/// Index of the strictly lowest finite latency, or `None` if every node is
/// unreachable. Ties go to the earliest entry.
pub fn select_fastest(measurements: &[LatencyMeasurement]) -> Option<usize> {
    let mut best = None;
    let mut best_ms = f64::INFINITY;

    for (i, measurement) in measurements.iter().enumerate() {
        let ms = measurement.latency.as_millis_f64();
        if ms < best_ms {
            best_ms = ms;
            best = Some(i);
        }
    }

    best
}

fn pick_random(workers: &[Node]) -> Option<&Node> {
    workers.choose(&mut rand::thread_rng())
}
