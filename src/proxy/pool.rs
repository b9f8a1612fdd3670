// src/proxy/pool.rs
use super::backend::Backend;
use crate::config::{ConfigUpdate, ConfigurationError, LoadBalancerConfig};
use crate::health::HealthStatus;
use crate::load_balancer::{create_load_balancer, select_healthy, LoadBalancer};
use crate::stats::LoadBalancerStats;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Shared backend list, selector and counters.
///
/// All runtime state sits behind one mutex so selection, connection
/// accounting and stats snapshots always agree. The lock is never held
/// across an await point. The active config is a separate immutable
/// snapshot, swapped only while the state lock is held.
#[derive(Clone)]
pub struct BackendPool {
    config: Arc<ArcSwap<LoadBalancerConfig>>,
    state: Arc<Mutex<PoolState>>,
}

struct PoolState {
    /// Bumped whenever the backend list is replaced; leases and probes from
    /// an older list are ignored.
    generation: u64,
    backends: Vec<Backend>,
    balancer: Box<dyn LoadBalancer>,
    total_requests: u64,
}

impl PoolState {
    fn backend_mut(&mut self, generation: u64, index: usize) -> Option<&mut Backend> {
        if generation != self.generation {
            return None;
        }
        self.backends.get_mut(index)
    }
}

/// Address of one backend as seen when a probe cycle started.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    generation: u64,
    index: usize,
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl BackendPool {
    /// `config` must already be validated.
    pub fn new(config: LoadBalancerConfig) -> Self {
        let balancer = create_load_balancer(config.algorithm);
        Self::with_load_balancer(config, balancer)
    }

    /// Same as `new`, with an explicit selector instead of the configured one.
    pub fn with_load_balancer(config: LoadBalancerConfig, balancer: Box<dyn LoadBalancer>) -> Self {
        let backends: Vec<Backend> = config.backends.iter().map(Backend::new).collect();
        tracing::debug!(
            backends = backends.len(),
            balancer = balancer.name(),
            "backend pool created"
        );

        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            state: Arc::new(Mutex::new(PoolState {
                generation: 0,
                backends,
                balancer,
                total_requests: 0,
            })),
        }
    }

    pub fn config(&self) -> Arc<LoadBalancerConfig> {
        self.config.load_full()
    }

    /// Count one inbound request and, if any backend is healthy, pick one and
    /// hold a connection slot on it until the returned lease is dropped.
    pub fn acquire(&self) -> Option<BackendLease> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.total_requests += 1;

        let index = select_healthy(state.balancer.as_ref(), &state.backends)?;
        let backend = &mut state.backends[index];
        backend.acquire();

        Some(BackendLease {
            pool: self.clone(),
            generation: state.generation,
            index,
            id: backend.id.clone(),
            host: backend.host.clone(),
            port: backend.port,
        })
    }

    pub fn probe_targets(&self) -> Vec<ProbeTarget> {
        let state = self.state.lock();
        state
            .backends
            .iter()
            .enumerate()
            .map(|(index, backend)| ProbeTarget {
                generation: state.generation,
                index,
                id: backend.id.clone(),
                host: backend.host.clone(),
                port: backend.port,
            })
            .collect()
    }

    /// Returns the previous status, or `None` when the backend list was
    /// replaced after the probe started.
    pub fn record_probe(
        &self,
        target: &ProbeTarget,
        healthy: bool,
        latency: Duration,
    ) -> Option<HealthStatus> {
        let mut state = self.state.lock();
        let backend = state.backend_mut(target.generation, target.index)?;
        let previous = backend.health_status();
        backend.record_probe(healthy, latency);
        Some(previous)
    }

    /// Put a backend back into rotation without waiting for a probe.
    pub fn reset_health(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        match state.backends.iter_mut().find(|b| b.id == id) {
            Some(backend) => {
                backend.set_health(HealthStatus::Healthy);
                tracing::info!(backend = %id, "backend health reset");
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> LoadBalancerStats {
        let state = self.state.lock();
        let backend_stats: Vec<_> = state.backends.iter().map(Backend::stats).collect();

        LoadBalancerStats {
            total_requests: state.total_requests,
            active_connections: backend_stats.iter().map(|b| b.connections).sum(),
            backend_stats,
        }
    }

    /// Merge `update` into the active config. Nothing changes unless the
    /// merged result validates.
    pub fn update_config(
        &self,
        update: &ConfigUpdate,
    ) -> Result<Arc<LoadBalancerConfig>, ConfigurationError> {
        let mut state = self.state.lock();
        let current = self.config.load_full();
        let next = current.merged(update);
        next.validate()?;

        if next.port != current.port || next.host != current.host {
            tracing::warn!(
                host = %next.host,
                port = next.port,
                "listener address changes take effect on restart"
            );
        }

        if update.backends.is_some() {
            state.generation += 1;
            state.backends = next.backends.iter().map(Backend::new).collect();
            state.balancer = create_load_balancer(next.algorithm);
            tracing::info!(
                backends = state.backends.len(),
                generation = state.generation,
                balancer = state.balancer.name(),
                "backend list replaced, runtime stats reset"
            );
        } else if next.algorithm != current.algorithm {
            state.balancer = create_load_balancer(next.algorithm);
            tracing::info!(
                algorithm = %next.algorithm,
                balancer = state.balancer.name(),
                "load balancing algorithm changed"
            );
        }

        let next = Arc::new(next);
        self.config.store(next.clone());
        Ok(next)
    }

    fn release(&self, generation: u64, index: usize) {
        let mut state = self.state.lock();
        if let Some(backend) = state.backend_mut(generation, index) {
            backend.release();
        }
    }

    fn mark_unhealthy(&self, generation: u64, index: usize) {
        let mut state = self.state.lock();
        if let Some(backend) = state.backend_mut(generation, index) {
            backend.set_health(HealthStatus::Unhealthy);
        }
    }

    fn record_response_time(&self, generation: u64, index: usize, elapsed: Duration) {
        let mut state = self.state.lock();
        if let Some(backend) = state.backend_mut(generation, index) {
            backend.record_response_time(elapsed);
        }
    }
}

/// One in-flight request's claim on a backend. Dropping it gives the
/// connection slot back, whatever happened to the request.
pub struct BackendLease {
    pool: BackendPool,
    generation: u64,
    index: usize,
    id: String,
    host: String,
    port: u16,
}

impl BackendLease {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn mark_unhealthy(&self) {
        self.pool.mark_unhealthy(self.generation, self.index);
    }

    pub fn record_response_time(&self, elapsed: Duration) {
        self.pool.record_response_time(self.generation, self.index, elapsed);
    }
}

impl Drop for BackendLease {
    fn drop(&mut self) {
        self.pool.release(self.generation, self.index);
    }
}
