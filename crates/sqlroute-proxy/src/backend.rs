//! Database backend seam.
//!
//! The router, prober and executor only ever talk to a database through
//! these two traits. Production wires in [`MySqlConnector`](crate::MySqlConnector);
//! tests use the scripted doubles in `testing`.

use async_trait::async_trait;
use sqlroute_common::{Node, Result, Row};

/// Column names plus every row of a read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOutcome {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Opens fresh connections to nodes.
///
/// Failures to connect, handshake or authenticate are reported as
/// `SqlrouteError::DatabaseUnavailable`.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, node: &Node) -> Result<Box<dyn Session>>;
}

/// One open connection. Must be handed back through [`close`](Session::close)
/// on every path.
#[async_trait]
pub trait Session: Send {
    /// Runs a statement and fetches all rows with their column names.
    async fn query(&mut self, sql: &str) -> Result<ReadOutcome>;

    /// Runs a single autocommitted statement and returns the affected-row count.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    async fn close(self: Box<Self>) -> Result<()>;
}
