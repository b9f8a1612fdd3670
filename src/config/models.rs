// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Full load balancer configuration, as read from disk or produced by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub algorithm: LoadBalancerAlgorithm,
    /// Forward timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl LoadBalancerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Shallow merge: every field present in `update` replaces the current one.
    pub fn merged(&self, update: &ConfigUpdate) -> Self {
        let mut next = self.clone();
        if let Some(host) = &update.host {
            next.host = host.clone();
        }
        if let Some(port) = update.port {
            next.port = port;
        }
        if let Some(algorithm) = update.algorithm {
            next.algorithm = algorithm;
        }
        if let Some(request_timeout) = update.request_timeout {
            next.request_timeout = request_timeout;
        }
        if let Some(health_check) = &update.health_check {
            next.health_check = health_check.clone();
        }
        if let Some(backends) = &update.backends {
            next.backends = backends.clone();
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerAlgorithm {
    #[default]
    RoundRobin,
    LeastConnections,
    /// Configured as `weighted-round-robin`, but the draw is weighted random:
    /// frequencies converge to `weight / total`, with no short-run ordering.
    #[serde(rename = "weighted-round-robin")]
    WeightedRandom,
}

impl fmt::Display for LoadBalancerAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadBalancerAlgorithm::RoundRobin => "round-robin",
            LoadBalancerAlgorithm::LeastConnections => "least-connections",
            LoadBalancerAlgorithm::WeightedRandom => "weighted-round-robin",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub path: String,
    /// Milliseconds between probe cycles.
    pub interval: u64,
    /// Milliseconds before a single probe is abandoned.
    pub timeout: u64,
    /// Recorded only. A single failed probe marks a backend unhealthy.
    pub retries: u32,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
            interval: 30_000,
            timeout: 5_000,
            retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub id: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl BackendConfig {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Partial configuration accepted by `Proxy::update_config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub algorithm: Option<LoadBalancerAlgorithm>,
    pub request_timeout: Option<u64>,
    pub health_check: Option<HealthCheckConfig>,
    pub backends: Option<Vec<BackendConfig>>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_request_timeout() -> u64 {
    5_000
}

fn default_weight() -> u32 {
    1
}
