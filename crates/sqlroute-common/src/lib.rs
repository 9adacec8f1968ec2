//! sqlroute Common Types
//!
//! This crate provides the shared vocabulary of the sqlroute read/write
//! splitting proxy:
//!
//! - **Topology**: the manager/worker node layout and database credentials,
//!   loaded once at startup and never mutated afterwards
//! - **Protocol**: request/response bodies exchanged over HTTP, the routing
//!   [`Strategy`] and the derived [`OperationKind`]
//! - **Errors**: the [`SqlrouteError`] taxonomy and its HTTP status mapping
//!
//! # Example
//!
//! ```
//! use sqlroute_common::{Strategy, TopologyConfig};
//!
//! let config = TopologyConfig::from_json(
//!     r#"{"manager": {"host": "10.0.0.10", "port": 3306},
//!         "workers": [{"host": "10.0.0.11", "port": 3306}]}"#,
//! ).unwrap();
//! let topology = config.topology();
//! assert_eq!(topology.workers().len(), 1);
//!
//! let strategy: Strategy = "custom".parse().unwrap();
//! assert_eq!(strategy, Strategy::Custom);
//! ```

pub mod protocol;
pub mod topology;

pub use protocol::*;
pub use topology::{DbCredentials, Node, NodeAddr, Role, Topology, TopologyConfig};
