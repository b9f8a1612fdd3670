// ────────────────────────────────
// src/proxy/proxy.rs
// Request forwarding plus the stats/config surface used by admin callers
// ────────────────────────────────

use crate::config::{ConfigUpdate, ConfigurationError, LoadBalancerConfig};
use crate::health::HealthChecker;
use crate::proxy::{BackendLease, BackendPool};
use crate::stats::LoadBalancerStats;
use hyper::client::HttpConnector;
use hyper::header::{HeaderValue, RETRY_AFTER};
use hyper::{Body, Client, Request, Response, StatusCode, Uri, Version};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

pub const BACKEND_HEADER: &str = "x-load-balancer-backend";
pub const RESPONSE_TIME_HEADER: &str = "x-load-balancer-response-time";

/// Seconds a client is told to wait when no backend is available.
const RETRY_AFTER_SECS: &str = "5";

pub struct Proxy {
    pool: BackendPool,
    client: Client<HttpConnector, Body>,
}

impl Proxy {
    pub fn new(config: LoadBalancerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self::with_pool(BackendPool::new(config)))
    }

    pub fn with_pool(pool: BackendPool) -> Self {
        Self {
            pool,
            client: Client::builder().build_http(),
        }
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Spawn the periodic health monitor for this proxy's backends.
    pub fn start_health_checker(&self) -> anyhow::Result<Arc<HealthChecker>> {
        let checker = Arc::new(HealthChecker::new(self.pool.clone())?);
        tokio::spawn(checker.clone().start());
        Ok(checker)
    }

    /// Proxy one inbound request. Failures come back as 502/503 responses.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let span = tracing::debug_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        async move {
            match self.forward(req).await {
                Ok(response) => response,
                Err(err) => {
                    debug!(%err, "request not served by a backend");
                    err.into()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let lease = self.pool.acquire().ok_or(ProxyError::NoHealthyBackend)?;
        let request_timeout = self.pool.config().request_timeout();

        let (mut parts, body) = req.into_parts();
        parts.uri = upstream_uri(&lease, &parts.uri)?;
        parts.version = Version::HTTP_11;
        let outbound = Request::from_parts(parts, body);

        debug!(backend = %lease.id(), uri = %outbound.uri(), "forwarding");

        let start = Instant::now();
        let result = timeout(request_timeout, self.send(outbound)).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(mut response)) => {
                lease.record_response_time(elapsed);
                annotate(&mut response, &lease, elapsed);
                Ok(response)
            }
            Ok(Err(source)) => {
                lease.mark_unhealthy();
                warn!(backend = %lease.id(), error = %source, "forward failed, backend marked unhealthy");
                Err(ProxyError::Unreachable {
                    backend: lease.id().to_string(),
                    source,
                })
            }
            Err(_) => {
                lease.mark_unhealthy();
                warn!(backend = %lease.id(), ?request_timeout, "forward timed out, backend marked unhealthy");
                Err(ProxyError::Timeout {
                    backend: lease.id().to_string(),
                    after: request_timeout,
                })
            }
        }
    }

    /// Send and buffer the whole upstream response, so the connection slot
    /// stays held until the backend is done.
    async fn send(&self, req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
        let response = self.client.request(req).await?;
        let (parts, body) = response.into_parts();
        let bytes = hyper::body::to_bytes(body).await?;
        Ok(Response::from_parts(parts, Body::from(bytes)))
    }

    pub fn stats(&self) -> LoadBalancerStats {
        self.pool.stats()
    }

    pub fn config(&self) -> LoadBalancerConfig {
        self.pool.config().as_ref().clone()
    }

    pub fn update_config(&self, update: &ConfigUpdate) -> Result<(), ConfigurationError> {
        self.pool.update_config(update).map(|_| ())
    }

    pub fn reset_backend_health(&self, id: &str) -> bool {
        self.pool.reset_health(id)
    }
}

fn upstream_uri(lease: &BackendLease, inbound: &Uri) -> Result<Uri, ProxyError> {
    let path_and_query = inbound
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = format!("http://{}{}", lease.authority(), path_and_query).parse::<Uri>()?;
    Ok(uri)
}

fn annotate(response: &mut Response<Body>, lease: &BackendLease, elapsed: Duration) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&lease.authority()) {
        headers.insert(BACKEND_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", elapsed.as_millis())) {
        headers.insert(RESPONSE_TIME_HEADER, value);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No healthy backends available")]
    NoHealthyBackend,

    #[error("Backend {backend} did not respond within {after:?}")]
    Timeout { backend: String, after: Duration },

    #[error("Backend {backend} unreachable: {source}")]
    Unreachable {
        backend: String,
        #[source]
        source: hyper::Error,
    },

    #[error("Invalid upstream URI: {0}")]
    InvalidUpstreamUri(#[from] hyper::http::uri::InvalidUri),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoHealthyBackend => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

// Convert ProxyError to Hyper Response for error handling
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let status = err.status();
        let message = match err {
            ProxyError::NoHealthyBackend => "No healthy backends available",
            _ => "Bad gateway",
        };

        let mut response = Response::new(Body::from(message));
        *response.status_mut() = status;
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}
