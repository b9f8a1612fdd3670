// src/stats/mod.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time copy of the balancer counters. Never a live view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerStats {
    pub total_requests: u64,
    /// Sum of every backend's `connections`.
    pub active_connections: usize,
    pub backend_stats: Vec<BackendStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStats {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub connections: usize,
    pub healthy: bool,
    /// Milliseconds, from the latest successful probe or forward.
    pub response_time: Option<u64>,
    pub requests_handled: u64,
    pub last_health_check: Option<DateTime<Utc>>,
}

impl LoadBalancerStats {
    pub fn backend(&self, id: &str) -> Option<&BackendStats> {
        self.backend_stats.iter().find(|b| b.id == id)
    }
}
