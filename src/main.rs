// src/main.rs
use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::lookup_host;
use tokio::signal;
use tracing::{info, warn};

use bun_load_balancer::{
    config::{self, LoadBalancerConfig},
    proxy::Proxy,
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bun_load_balancer=info".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration; any validation error aborts before binding.
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path)
        .await
        .with_context(|| format!("Invalid configuration in {}", config_path))?;

    let addr = listen_addr(&config).await?;
    info!(
        algorithm = %config.algorithm,
        backends = config.backends.len(),
        "Starting load balancer on {}",
        addr
    );

    let proxy = Arc::new(Proxy::new(config)?);

    let health_checker = proxy.start_health_checker()?;
    if !proxy.config().health_check.enabled {
        warn!("Health checks disabled, backends stay in their initial state");
    }

    let handler = RequestHandler::new(proxy);

    ServerBuilder::new(addr)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    health_checker.shutdown();
    Ok(())
}

async fn listen_addr(config: &LoadBalancerConfig) -> Result<SocketAddr> {
    if let Ok(ip) = config.host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, config.port));
    }
    lookup_host((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to resolve {}", config.host))?
        .next()
        .with_context(|| format!("No address found for {}", config.host))
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
