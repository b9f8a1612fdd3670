// src/health/checker.rs
use crate::health::HealthStatus;
use crate::proxy::{BackendPool, ProbeTarget};
use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use tokio::time::{interval_at, timeout, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use url::Url;

pub struct HealthChecker {
    pool: BackendPool,
    client: Client,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct HealthCheckResult {
    pub backend_id: String,
    pub healthy: bool,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

impl HealthChecker {
    pub fn new(pool: BackendPool) -> Result<Self> {
        // Per-probe timeouts come from the live config, not the client.
        let client = Client::builder()
            .build()
            .context("Failed to create health check HTTP client")?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        Ok(Self {
            pool,
            client,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Probe every backend once per configured interval until shut down.
    /// The first cycle runs one interval after start.
    ///
    /// Cycles are detached from the ticker, so a hung backend neither delays
    /// the next tick nor holds up shutdown.
    pub async fn start(self: Arc<Self>) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut period = self.pool.config().health_check.interval();
        let mut ticker = probe_interval(period);

        info!("Starting health checker with interval: {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let health_check = self.pool.config().health_check.clone();

                    if health_check.enabled {
                        let checker = self.clone();
                        tokio::spawn(async move {
                            checker.check_all_backends().await;
                        });
                    }

                    // Config updates apply from the next tick on.
                    if health_check.interval() != period {
                        period = health_check.interval();
                        ticker = probe_interval(period);
                        info!("Health check interval changed to {:?}", period);
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Health checker shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Run one probe cycle. Each backend is probed in its own task.
    pub async fn check_all_backends(self: &Arc<Self>) -> Vec<HealthCheckResult> {
        let tasks: Vec<_> = self
            .pool
            .probe_targets()
            .into_iter()
            .map(|target| {
                let checker = self.clone();
                tokio::spawn(async move { checker.check_backend(target).await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;

        let mut checks = Vec::with_capacity(results.len());
        let mut healthy_count = 0;
        let mut unhealthy_count = 0;

        for result in results {
            match result {
                Ok(check_result) => {
                    if check_result.healthy {
                        healthy_count += 1;
                        debug!(
                            "Backend {} is healthy ({}ms)",
                            check_result.backend_id, check_result.response_time_ms
                        );
                    } else {
                        unhealthy_count += 1;
                        debug!(
                            "Backend {} is unhealthy: {:?}",
                            check_result.backend_id, check_result.error
                        );
                    }
                    checks.push(check_result);
                }
                Err(e) => {
                    error!("Health check task failed: {}", e);
                    unhealthy_count += 1;
                }
            }
        }

        info!(
            "Health check complete: {} healthy, {} unhealthy",
            healthy_count, unhealthy_count
        );

        checks
    }

    async fn check_backend(&self, target: ProbeTarget) -> HealthCheckResult {
        let health_check = self.pool.config().health_check.clone();
        let start = Instant::now();

        let outcome = match probe_url(&target, &health_check.path) {
            Ok(url) => match timeout(health_check.timeout(), self.client.get(url).send()).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.is_success() {
                        Ok(())
                    } else {
                        Err(format!("HTTP {}", status))
                    }
                }
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err("Request timeout".to_string()),
            },
            Err(e) => Err(e.to_string()),
        };

        let elapsed = start.elapsed();
        let healthy = outcome.is_ok();
        let previous = self.pool.record_probe(&target, healthy, elapsed);

        // Transition logging
        match previous {
            Some(HealthStatus::Unhealthy) if healthy => {
                info!(backend = %target.id, "Backend {} is healthy again", target.id);
            }
            Some(status) if !healthy && status != HealthStatus::Unhealthy => {
                warn!(
                    backend = %target.id,
                    error = ?outcome.as_ref().err(),
                    "Backend {} is now unhealthy",
                    target.id
                );
            }
            None => {
                debug!(backend = %target.id, "Backend list changed during probe, result dropped");
            }
            _ => {}
        }

        HealthCheckResult {
            backend_id: target.id,
            healthy,
            response_time_ms: elapsed.as_millis() as u64,
            error: outcome.err(),
        }
    }
}

fn probe_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn probe_url(target: &ProbeTarget, path: &str) -> Result<Url, url::ParseError> {
    let base = Url::parse(&format!("http://{}:{}", target.host, target.port))?;
    base.join(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, HealthCheckConfig, LoadBalancerConfig};

    #[test]
    fn test_probe_url_splices_path() {
        let pool = BackendPool::new(crate::config::LoadBalancerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            algorithm: Default::default(),
            request_timeout: 5_000,
            health_check: Default::default(),
            backends: vec![crate::config::BackendConfig::new("api", "localhost", 3001)],
        });
        let target = &pool.probe_targets()[0];

        let url = probe_url(target, "/internal/health").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/internal/health");
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let pool = BackendPool::new(crate::config::LoadBalancerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            algorithm: Default::default(),
            request_timeout: 5_000,
            health_check: Default::default(),
            backends: Vec::new(),
        });
        let checker = Arc::new(HealthChecker::new(pool).unwrap());
        let handle = tokio::spawn(checker.clone().start());

        checker.shutdown();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("checker exits after shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_does_not_wait_for_hung_probe() {
        // Accepts connections through the backlog but never answers.
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();

        let pool = BackendPool::new(LoadBalancerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            algorithm: Default::default(),
            request_timeout: 5_000,
            health_check: HealthCheckConfig {
                interval: 20,
                timeout: 10_000,
                ..Default::default()
            },
            backends: vec![BackendConfig::new("hung", "127.0.0.1", port)],
        });
        let checker = Arc::new(HealthChecker::new(pool).unwrap());
        let handle = tokio::spawn(checker.clone().start());

        tokio::time::sleep(Duration::from_millis(100)).await;
        checker.shutdown();
        timeout(Duration::from_millis(500), handle)
            .await
            .expect("checker exits while a probe is still pending")
            .unwrap();
        drop(silent);
    }
}
