// Copyright 2025 sqlroute Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics for one routing key, e.g. `custom/read`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteMetrics {
    pub query_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
}

/// Metrics for a specific target node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeMetrics {
    pub node_addr: String,
    pub request_count: u64,
    pub last_request_ms: u64,
}

/// Complete metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub probes: u64,
    pub unreachable_probes: u64,
    pub uptime_ms: u64,
    pub version: String,
    pub routes: BTreeMap<String, RouteMetrics>,
    pub nodes: BTreeMap<String, NodeMetrics>,
}

impl MetricsSnapshot {
    pub fn new(uptime_ms: u64) -> Self {
        Self {
            total_queries: 0,
            successful_queries: 0,
            failed_queries: 0,
            probes: 0,
            unreachable_probes: 0,
            uptime_ms,
            version: env!("CARGO_PKG_VERSION").to_string(),
            routes: BTreeMap::new(),
            nodes: BTreeMap::new(),
        }
    }
}
