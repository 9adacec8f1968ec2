//! Request-side protocol types.
//!
//! A query arrives as a JSON [`QueryRequest`] body plus an optional
//! `strategy` query-string parameter ([`QueryParams`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SqlrouteError;

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub sql: String,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryRequest { sql: sql.into() }
    }
}

/// Query-string parameters of `POST /query`.
///
/// The strategy is kept as raw text so that an unknown value can be rejected
/// with a proper error body instead of an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryParams {
    pub strategy: Option<String>,
}

impl QueryParams {
    /// Resolves the requested strategy, defaulting to [`Strategy::Direct`].
    pub fn strategy(&self) -> Result<Strategy, SqlrouteError> {
        match &self.strategy {
            Some(raw) => raw.parse(),
            None => Ok(Strategy::default()),
        }
    }
}

/// Read/write classification of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Write,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Write => "write",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy used to pick the node that serves a read.
///
/// Writes always go to the manager whatever the strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Every statement goes to the manager.
    #[default]
    Direct,
    /// Reads go to a uniformly random worker.
    Random,
    /// Reads go to the worker with the lowest probed latency.
    Custom,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Direct, Strategy::Random, Strategy::Custom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Random => "random",
            Strategy::Custom => "custom",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = SqlrouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Strategy::Direct),
            "random" => Ok(Strategy::Random),
            "custom" => Ok(Strategy::Custom),
            other => Err(SqlrouteError::InvalidStrategy(other.to_string())),
        }
    }
}
