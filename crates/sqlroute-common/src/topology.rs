//! Node topology and database credentials.
//!
//! The topology is described by a JSON document written by the provisioning
//! tooling:
//!
//! ```json
//! {
//!   "manager": {"host": "10.0.0.10", "port": 3306},
//!   "workers": [{"host": "10.0.0.11", "port": 3306}, {"host": "10.0.0.12", "port": 3306}],
//!   "listen_port": 8080
//! }
//! ```
//!
//! Credentials are not part of the file; they come from `DB_USER`,
//! `DB_PASSWORD` and `DB_NAME`.
//!
//! A [`Topology`] is built once at startup and shared by reference between
//! all in-flight requests. It has no mutating methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::protocol::error::{Result, SqlrouteError};

const DEFAULT_LISTEN_PORT: u16 = 8080;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

/// `host`/`port` pair as it appears in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl NodeAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        NodeAddr {
            host: host.into(),
            port,
        }
    }
}

/// Role of a node in the primary/replica layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The single writable node.
    Manager,
    /// A read-only replica.
    Worker,
}

/// A database node. Two nodes are the same node when host and port match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub host: String,
    pub port: u16,
    pub role: Role,
}

impl Node {
    pub fn manager(host: impl Into<String>, port: u16) -> Self {
        Node {
            host: host.into(),
            port,
            role: Role::Manager,
        }
    }

    pub fn worker(host: impl Into<String>, port: u16) -> Self {
        Node {
            host: host.into(),
            port,
            role: Role::Worker,
        }
    }

    /// `host:port`, used as the node key in logs and metrics.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn to_node_addr(&self) -> NodeAddr {
        NodeAddr::new(self.host.clone(), self.port)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Exactly one manager and zero or more workers, in configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    manager: Node,
    workers: Vec<Node>,
}

impl Topology {
    pub fn new(manager: NodeAddr, workers: Vec<NodeAddr>) -> Self {
        Topology {
            manager: Node::manager(manager.host, manager.port),
            workers: workers
                .into_iter()
                .map(|w| Node::worker(w.host, w.port))
                .collect(),
        }
    }

    pub fn manager(&self) -> &Node {
        &self.manager
    }

    /// Workers in the order they were configured.
    pub fn workers(&self) -> &[Node] {
        &self.workers
    }

    pub fn has_workers(&self) -> bool {
        !self.workers.is_empty()
    }
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

/// Deserialized configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopologyConfig {
    pub manager: NodeAddr,
    #[serde(default)]
    pub workers: Vec<NodeAddr>,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Bound on establishing a connection, for probes and queries alike.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Bound on running a single statement once connected.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl TopologyConfig {
    /// Reads and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SqlrouteError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: TopologyConfig = serde_json::from_str(content)
            .map_err(|e| SqlrouteError::Config(format!("Invalid topology config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_addr(&self.manager, "manager")?;
        for (i, worker) in self.workers.iter().enumerate() {
            validate_addr(worker, &format!("workers[{}]", i))?;
        }
        if self.connect_timeout_ms == 0 {
            return Err(SqlrouteError::Config(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(SqlrouteError::Config(
                "query_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn topology(&self) -> Topology {
        Topology::new(self.manager.clone(), self.workers.clone())
    }
}

fn validate_addr(addr: &NodeAddr, field: &str) -> Result<()> {
    if addr.host.trim().is_empty() {
        return Err(SqlrouteError::Config(format!("{}.host must not be empty", field)));
    }
    if addr.port == 0 {
        return Err(SqlrouteError::Config(format!("{}.port must not be 0", field)));
    }
    Ok(())
}

/// Database login shared by every node.
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbCredentials {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        DbCredentials {
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// Reads `DB_USER`, `DB_PASSWORD` and `DB_NAME`, falling back to
    /// `app` / `password` / `sakila`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        DbCredentials {
            user: lookup("DB_USER").unwrap_or_else(|| "app".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_else(|| "password".to_string()),
            database: lookup("DB_NAME").unwrap_or_else(|| "sakila".to_string()),
        }
    }
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}
