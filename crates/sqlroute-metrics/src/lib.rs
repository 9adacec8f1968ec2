//! sqlroute Metrics Collection
//!
//! Thread-safe counters for the sqlroute proxy: how many queries were
//! served, per routing key (`<strategy>/<operation>`) and per target node,
//! how long they took, and how many latency probes found a worker
//! unreachable.
//!
//! # Architecture
//!
//! - [`MetricsRegistry`]: storage, lock-free on the hot path
//! - [`MetricsSnapshot`]: serializable point-in-time copy served by `GET /metrics`
//!
//! Metrics are observational only. Nothing in the routing path reads them
//! back, so routing decisions never depend on earlier requests.
//!
//! # Usage Example
//!
//! ```rust
//! use sqlroute_metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new();
//! registry.record_query("random/read", 1_250, true);
//! registry.record_node_request("10.0.0.11:3306");
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.total_queries, 1);
//! assert_eq!(snapshot.nodes["10.0.0.11:3306"].request_count, 1);
//! ```

mod registry;
mod snapshot;

pub use registry::MetricsRegistry;
pub use snapshot::{MetricsSnapshot, NodeMetrics, RouteMetrics};
