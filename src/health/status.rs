// src/health/status.rs
use serde::Serialize;

/// Per-backend health: `Unknown -> Healthy <-> Unhealthy`.
///
/// Nothing is probed before the first cycle, so `Unknown` is treated as
/// eligible for traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_available(self) -> bool {
        !matches!(self, HealthStatus::Unhealthy)
    }
}
