use crate::snapshot::{MetricsSnapshot, NodeMetrics, RouteMetrics};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::{Instant, SystemTime};

/// Wall-clock milliseconds since the Unix epoch, or 0 if the clock is
/// set before it.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-route counters. Lock-free once the entry exists.
#[derive(Debug, Default)]
struct RouteStats {
    query_count: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl RouteStats {
    fn record(&self, latency_us: u64, success: bool) {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RouteMetrics {
        let query_count = self.query_count.load(Ordering::Relaxed);
        let total_latency_us = self.total_latency_us.load(Ordering::Relaxed);
        let avg_latency_us = if query_count == 0 {
            0
        } else {
            total_latency_us / query_count
        };

        RouteMetrics {
            query_count,
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            avg_latency_us,
            max_latency_us: self.max_latency_us.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct NodeStats {
    request_count: AtomicU64,
    last_request_ms: AtomicU64,
}

impl NodeStats {
    fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.last_request_ms.store(unix_millis(), Ordering::Relaxed);
    }

    fn snapshot(&self, node_addr: &str) -> NodeMetrics {
        NodeMetrics {
            node_addr: node_addr.to_string(),
            request_count: self.request_count.load(Ordering::Relaxed),
            last_request_ms: self.last_request_ms.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe metrics registry.
///
/// Global counters are plain relaxed atomics. The route and node tables sit
/// behind a `RwLock` that is held only long enough to find or insert an
/// entry; the entry's own counters are then updated without the lock.
///
/// The number of distinct routes is bounded by strategies × operations and
/// the number of nodes by the topology, so unlike a general-purpose
/// registry there is no eviction.
///
/// # Example
///
/// ```rust
/// use sqlroute_metrics::MetricsRegistry;
///
/// let registry = MetricsRegistry::new();
/// registry.record_query("direct/write", 850, true);
/// registry.record_probe(false);
///
/// let snapshot = registry.snapshot();
/// assert_eq!(snapshot.successful_queries, 1);
/// assert_eq!(snapshot.unreachable_probes, 1);
/// ```
#[derive(Debug)]
pub struct MetricsRegistry {
    total_queries: AtomicU64,
    successful_queries: AtomicU64,
    failed_queries: AtomicU64,
    probes: AtomicU64,
    unreachable_probes: AtomicU64,
    routes: StdRwLock<HashMap<String, Arc<RouteStats>>>,
    nodes: StdRwLock<HashMap<String, Arc<NodeStats>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            total_queries: AtomicU64::new(0),
            successful_queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
            probes: AtomicU64::new(0),
            unreachable_probes: AtomicU64::new(0),
            routes: StdRwLock::new(HashMap::new()),
            nodes: StdRwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records one handled query.
    ///
    /// # Arguments
    /// * `route` - Routing key, `<strategy>/<operation>`
    /// * `latency_us` - End-to-end handling time in microseconds
    /// * `success` - Whether a result was produced
    pub fn record_query(&self, route: &str, latency_us: u64, success: bool) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_queries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }

        let stats = {
            let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
            routes
                .entry(route.to_string())
                .or_insert_with(|| Arc::new(RouteStats::default()))
                .clone()
        };

        stats.record(latency_us, success);
    }

    /// Records that a query was sent to the node at `node_addr` (`host:port`).
    pub fn record_node_request(&self, node_addr: &str) {
        let stats = {
            let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
            nodes
                .entry(node_addr.to_string())
                .or_insert_with(|| Arc::new(NodeStats::default()))
                .clone()
        };

        stats.record_request();
    }

    /// Records the outcome of one latency probe.
    pub fn record_probe(&self, reachable: bool) {
        self.probes.fetch_add(1, Ordering::Relaxed);
        if !reachable {
            self.unreachable_probes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Milliseconds since the registry was created.
    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Takes a best-effort point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::new(self.uptime_ms());
        snapshot.total_queries = self.total_queries.load(Ordering::Relaxed);
        snapshot.successful_queries = self.successful_queries.load(Ordering::Relaxed);
        snapshot.failed_queries = self.failed_queries.load(Ordering::Relaxed);
        snapshot.probes = self.probes.load(Ordering::Relaxed);
        snapshot.unreachable_probes = self.unreachable_probes.load(Ordering::Relaxed);

        {
            let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
            snapshot.routes = routes
                .iter()
                .map(|(route, stats)| (route.clone(), stats.snapshot()))
                .collect();
        }

        {
            let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
            snapshot.nodes = nodes
                .iter()
                .map(|(addr, stats)| (addr.clone(), stats.snapshot(addr)))
                .collect();
        }

        snapshot
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
