// src/config/validate.rs
use super::models::{BackendConfig, HealthCheckConfig, LoadBalancerConfig};
use regex::Regex;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

const MAX_HOST_LEN: usize = 253;
const MAX_PATH_LEN: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid port {port} for {field}")]
    InvalidPort { field: String, port: u16 },

    #[error("Invalid host {host:?} for {field}")]
    InvalidHost { field: String, host: String },

    #[error("Invalid health check path {0:?}")]
    InvalidPath(String),

    #[error("Invalid backend id {0:?}")]
    InvalidBackendId(String),

    #[error("Duplicate backend id {0:?}")]
    DuplicateBackendId(String),

    #[error("Backend {id} has weight 0, weights must be positive")]
    InvalidWeight { id: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
        )
        .expect("hostname pattern is valid")
    })
}

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^/[A-Za-z0-9/_.\-]*$").expect("path pattern is valid"))
}

fn backend_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._:-]{1,64}$").expect("id pattern is valid"))
}

impl LoadBalancerConfig {
    /// Reject anything that would leave the balancer half-configured.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_port("port", self.port)?;
        validate_host("host", &self.host)?;

        if self.request_timeout == 0 {
            return Err(ConfigurationError::ZeroDuration("requestTimeout"));
        }

        self.health_check.validate()?;

        let mut seen = HashSet::new();
        for backend in &self.backends {
            backend.validate()?;
            if !seen.insert(backend.id.as_str()) {
                return Err(ConfigurationError::DuplicateBackendId(backend.id.clone()));
            }
        }

        Ok(())
    }
}

impl HealthCheckConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_path(&self.path)?;
        if self.interval == 0 {
            return Err(ConfigurationError::ZeroDuration("healthCheck.interval"));
        }
        if self.timeout == 0 {
            return Err(ConfigurationError::ZeroDuration("healthCheck.timeout"));
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !backend_id_pattern().is_match(&self.id) {
            return Err(ConfigurationError::InvalidBackendId(self.id.clone()));
        }
        let field = format!("backend {}", self.id);
        validate_port(&field, self.port)?;
        validate_host(&field, &self.host)?;
        if self.weight == 0 {
            return Err(ConfigurationError::InvalidWeight {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

fn validate_port(field: &str, port: u16) -> Result<(), ConfigurationError> {
    // u16 already caps the upper bound
    if port == 0 {
        return Err(ConfigurationError::InvalidPort {
            field: field.to_string(),
            port,
        });
    }
    Ok(())
}

/// Accepts a dotted IPv4 address, `localhost`, or an RFC 1123 hostname.
pub fn is_valid_host(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_HOST_LEN {
        return false;
    }
    // All-numeric names must be real IPv4 addresses, so 999.1.1.1 is rejected.
    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return host.parse::<Ipv4Addr>().is_ok();
    }
    hostname_pattern().is_match(host)
}

fn validate_host(field: &str, host: &str) -> Result<(), ConfigurationError> {
    if is_valid_host(host) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidHost {
            field: field.to_string(),
            host: host.to_string(),
        })
    }
}

fn validate_path(path: &str) -> Result<(), ConfigurationError> {
    let traversal = path.contains("..") || path.contains('~');
    if traversal || path.len() > MAX_PATH_LEN || !path_pattern().is_match(path) {
        return Err(ConfigurationError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadBalancerAlgorithm;

    fn base_config() -> LoadBalancerConfig {
        LoadBalancerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            algorithm: LoadBalancerAlgorithm::RoundRobin,
            request_timeout: 5_000,
            health_check: HealthCheckConfig::default(),
            backends: vec![
                BackendConfig::new("api-1", "localhost", 3001),
                BackendConfig::new("api-2", "10.0.0.12", 3002),
            ],
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_empty_backend_list_is_valid() {
        let mut config = base_config();
        config.backends.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_ports() {
        let mut config = base_config();
        config.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidPort { .. })
        ));

        let mut config = base_config();
        config.backends[1].port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidPort { .. })
        ));
    }

    #[test]
    fn test_host_patterns() {
        for host in ["localhost", "127.0.0.1", "api.internal", "svc-1.example.com"] {
            assert!(is_valid_host(host), "{host} should be accepted");
        }
        for host in ["", "999.1.1.1", "bad host", "-leading.dash", "a/b", "http://x"] {
            assert!(!is_valid_host(host), "{host} should be rejected");
        }
    }

    #[test]
    fn test_rejects_bad_backend_host() {
        let mut config = base_config();
        config.backends[0].host = "not a host".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidHost { .. })
        ));
    }

    #[test]
    fn test_rejects_traversal_paths() {
        for path in ["/../etc/passwd", "/~root", "health", "/he alth", "/a?b=1"] {
            let mut config = base_config();
            config.health_check.path = path.to_string();
            assert!(
                matches!(config.validate(), Err(ConfigurationError::InvalidPath(_))),
                "{path} should be rejected"
            );
        }

        let mut config = base_config();
        config.health_check.path = format!("/{}", "a".repeat(MAX_PATH_LEN));
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_backend_ids() {
        let mut config = base_config();
        config.backends[0].id = "node-1.api:3001".to_string();
        assert!(config.validate().is_ok());

        let too_long = "x".repeat(65);
        for id in ["", "has space", "semi;colon", too_long.as_str()] {
            let mut config = base_config();
            config.backends[0].id = id.to_string();
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::InvalidBackendId(_))
            ));
        }
    }

    #[test]
    fn test_rejects_duplicate_ids_and_zero_weight() {
        let mut config = base_config();
        config.backends[1].id = "api-1".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::DuplicateBackendId(_))
        ));

        let mut config = base_config();
        config.backends[0].weight = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_durations() {
        let mut config = base_config();
        config.health_check.interval = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::ZeroDuration(_))
        ));

        let mut config = base_config();
        config.request_timeout = 0;
        assert!(config.validate().is_err());
    }
}
