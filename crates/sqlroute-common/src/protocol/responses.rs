//! Response-side protocol types.
//!
//! Successful queries are answered with a [`QueryResponse`]: the routing
//! description under `target` followed by the [`QueryResult`] fields, tagged
//! by `operation`:
//!
//! ```json
//! {"target": "manager", "operation": "read", "columns": ["cnt"], "rows": [[1000]], "count": 1}
//! {"target": "manager", "operation": "write", "affected": 1}
//! ```
//!
//! Failures carry a single `detail` string ([`ErrorResponse`]).

use serde::{Deserialize, Serialize};

use crate::topology::NodeAddr;

/// One result row, values in column order.
pub type Row = Vec<serde_json::Value>;

/// Outcome of executing a statement, tagged by operation kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum QueryResult {
    Read {
        columns: Vec<String>,
        rows: Vec<Row>,
        count: usize,
    },
    Write {
        affected: u64,
    },
}

impl QueryResult {
    /// Builds a read result; `count` is derived from the rows.
    pub fn read(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let count = rows.len();
        QueryResult::Read { columns, rows, count }
    }

    pub fn write(affected: u64) -> Self {
        QueryResult::Write { affected }
    }
}

/// Body of a successful `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// Routing description, e.g. `manager` or `worker(random) 10.0.0.11`.
    pub target: String,
    #[serde(flatten)]
    pub result: QueryResult,
}

/// Body of every non-2xx answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        ErrorResponse { detail: detail.into() }
    }
}

/// Body of `GET /health`. Never includes the database password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub manager: NodeAddr,
    pub workers: Vec<NodeAddr>,
    pub db_user: String,
    pub db_name: String,
}
