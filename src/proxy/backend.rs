// src/proxy/backend.rs
use crate::config::BackendConfig;
use crate::health::HealthStatus;
use crate::stats::BackendStats;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A registered upstream plus its runtime state.
///
/// Only ever touched while the pool's state lock is held.
#[derive(Debug, Clone)]
pub struct Backend {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub weight: u32,

    // Runtime state
    connections: usize,
    requests_handled: u64,
    health_status: HealthStatus,
    last_health_check: Option<DateTime<Utc>>,
    response_time_ms: Option<u64>,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            id: config.id.clone(),
            host: config.host.clone(),
            port: config.port,
            weight: config.weight,
            connections: 0,
            requests_handled: 0,
            health_status: HealthStatus::Unknown,
            last_health_check: None,
            response_time_ms: None,
        }
    }

    pub fn active_connections(&self) -> usize {
        self.connections
    }

    pub fn is_healthy(&self) -> bool {
        self.health_status.is_available()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.health_status
    }

    pub(crate) fn acquire(&mut self) {
        self.connections += 1;
        self.requests_handled += 1;
    }

    pub(crate) fn release(&mut self) {
        self.connections = self.connections.saturating_sub(1);
    }

    pub(crate) fn record_response_time(&mut self, elapsed: Duration) {
        self.response_time_ms = Some(elapsed.as_millis() as u64);
    }

    pub(crate) fn set_health(&mut self, status: HealthStatus) {
        self.health_status = status;
    }

    pub(crate) fn record_probe(&mut self, healthy: bool, latency: Duration) {
        if healthy {
            self.health_status = HealthStatus::Healthy;
            self.record_response_time(latency);
        } else {
            self.health_status = HealthStatus::Unhealthy;
        }
        self.last_health_check = Some(Utc::now());
    }

    pub fn stats(&self) -> BackendStats {
        BackendStats {
            id: self.id.clone(),
            host: self.host.clone(),
            port: self.port,
            weight: self.weight,
            connections: self.connections,
            healthy: self.is_healthy(),
            response_time: self.response_time_ms,
            requests_handled: self.requests_handled,
            last_health_check: self.last_health_check,
        }
    }
}
