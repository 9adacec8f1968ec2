//! sqlroute Proxy
//!
//! The routing-and-execution engine of the read/write splitting proxy.
//! Per request:
//!
//! 1. [`classify`] the SQL as a read or a write
//! 2. [`StrategyRouter`] picks the node: the manager for writes and
//!    `direct` reads, a random or lowest-latency worker otherwise
//! 3. [`QueryExecutor`] runs the statement on a fresh connection
//! 4. [`QueryHandler`] shapes the result, [`HttpServer`] puts it on the wire
//!
//! Every database interaction goes through the [`Connector`] / [`Session`]
//! seam. [`MySqlConnector`] is the production implementation.

pub mod backend;
pub mod classifier;
pub mod executor;
pub mod handler;
pub mod http_server;
pub mod mysql;
pub mod prober;
pub mod router;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use backend::{Connector, ReadOutcome, Session};
pub use classifier::classify;
pub use executor::QueryExecutor;
pub use handler::QueryHandler;
pub use http_server::HttpServer;
pub use mysql::MySqlConnector;
pub use prober::{Latency, LatencyMeasurement, LatencyProber};
pub use router::{select_fastest, RoutingDecision, StrategyRouter};
