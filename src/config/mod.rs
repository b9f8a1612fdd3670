// src/config/mod.rs
mod models;
mod validate;

pub use models::*;
pub use validate::{is_valid_host, ConfigurationError};

use std::path::Path;

/// Load configuration from a file (YAML or JSON) and validate it.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<LoadBalancerConfig, ConfigurationError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;

    let config = parse_config(&contents, is_yaml(path))?;
    config.validate()?;
    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn parse_config(contents: &str, yaml: bool) -> Result<LoadBalancerConfig, ConfigurationError> {
    if yaml {
        serde_yaml::from_str(contents).map_err(|e| ConfigurationError::Parse(e.to_string()))
    } else {
        serde_json::from_str(contents).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_with_defaults() {
        let config = parse_config(
            r#"{
                "port": 8080,
                "algorithm": "weighted-round-robin",
                "backends": [
                    {"id": "a", "host": "localhost", "port": 3001, "weight": 3},
                    {"id": "b", "host": "localhost", "port": 3002}
                ]
            }"#,
            false,
        )
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.algorithm, LoadBalancerAlgorithm::WeightedRandom);
        assert_eq!(config.request_timeout, 5_000);
        assert_eq!(config.health_check, HealthCheckConfig::default());
        assert_eq!(config.backends[0].weight, 3);
        assert_eq!(config.backends[1].weight, 1);
    }

    #[test]
    fn test_parse_yaml() {
        let config = parse_config(
            "port: 9000\nalgorithm: least-connections\nhealthCheck:\n  enabled: false\n  interval: 1000\nbackends:\n  - id: web\n    host: 127.0.0.1\n    port: 3000\n",
            true,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.algorithm, LoadBalancerAlgorithm::LeastConnections);
        assert!(!config.health_check.enabled);
        assert_eq!(config.health_check.interval, 1000);
        assert_eq!(config.health_check.path, "/health");
        assert_eq!(config.backends.len(), 1);
    }

    #[test]
    fn test_out_of_range_port_is_a_configuration_error() {
        let err = parse_config(r#"{"port": 70000}"#, false).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        assert!(parse_config(r#"{"port": 80, "algorithm": "ip-hash"}"#, false).is_err());
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/lb.yaml").await.unwrap_err();
        assert!(matches!(err, ConfigurationError::Read(_)));
    }
}
