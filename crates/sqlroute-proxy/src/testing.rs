//! In-memory backend for tests.
//!
//! [`ScriptedConnector`] answers every node from a per-address
//! [`NodeScript`] and keeps count of the connections it hands out, so tests
//! can assert that nothing leaks on error paths.

use async_trait::async_trait;
use serde_json::json;
use sqlroute_common::{Node, Result, Row, SqlrouteError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{Connector, ReadOutcome, Session};

/// How one node behaves.
#[derive(Debug, Clone, Default)]
pub struct NodeScript {
    latency: Duration,
    statement_delay: Duration,
    unreachable: bool,
    read: ReadOutcome,
    affected: u64,
    failure: Option<String>,
}

impl NodeScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time spent in `connect` before it resolves.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Time every statement, probes included, spends before it answers.
    pub fn with_statement_delay(mut self, delay: Duration) -> Self {
        self.statement_delay = delay;
        self
    }

    /// `connect` fails with `DatabaseUnavailable`.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Result of any read other than the `SELECT 1` probe.
    pub fn with_rows(mut self, columns: &[&str], rows: Vec<Row>) -> Self {
        self.read = ReadOutcome {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        };
        self
    }

    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    /// Every statement fails with `QueryExecutionFailed(message)`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

#[derive(Debug, Default)]
struct Inner {
    scripts: Mutex<HashMap<String, NodeScript>>,
    open: AtomicUsize,
    opened: AtomicUsize,
    statements: Mutex<Vec<(String, String)>>,
}

/// Scripted [`Connector`]. Clones share scripts and counters.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    inner: Arc<Inner>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the node at `addr` (`host:port`). Unscripted nodes connect
    /// instantly and return empty results.
    pub fn with_node(self, addr: impl Into<String>, script: NodeScript) -> Self {
        self.inner
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(addr.into(), script);
        self
    }

    /// Connections handed out and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Connections handed out since creation.
    pub fn total_connections(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Every statement run so far, as `(addr, sql)` in arrival order.
    pub fn statements(&self) -> Vec<(String, String)> {
        self.inner
            .statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Statements run on `addr`, excluding latency probes.
    pub fn statements_for(&self, addr: &str) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|(a, sql)| a == addr && sql != "SELECT 1")
            .map(|(_, sql)| sql)
            .collect()
    }

    fn script(&self, addr: &str) -> NodeScript {
        self.inner
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(addr)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, node: &Node) -> Result<Box<dyn Session>> {
        let addr = node.addr();
        let script = self.script(&addr);

        tokio::time::sleep(script.latency).await;

        if script.unreachable {
            return Err(SqlrouteError::DatabaseUnavailable(format!(
                "Can't connect to MySQL server on '{}'",
                addr
            )));
        }

        self.inner.open.fetch_add(1, Ordering::SeqCst);
        self.inner.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedSession {
            addr,
            script,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct ScriptedSession {
    addr: String,
    script: NodeScript,
    inner: Arc<Inner>,
}

impl ScriptedSession {
    async fn log(&self, sql: &str) -> Result<()> {
        tokio::time::sleep(self.script.statement_delay).await;
        self.inner
            .statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((self.addr.clone(), sql.to_string()));

        match &self.script.failure {
            Some(message) => Err(SqlrouteError::QueryExecutionFailed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn query(&mut self, sql: &str) -> Result<ReadOutcome> {
        self.log(sql).await?;
        if sql == "SELECT 1" {
            return Ok(ReadOutcome {
                columns: vec!["1".to_string()],
                rows: vec![vec![json!(1)]],
            });
        }
        Ok(self.script.read.clone())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.log(sql).await?;
        Ok(self.script.affected)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
