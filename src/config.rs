//! Harness configuration
//!
//! The capture engine and GraphQL clients take explicit configuration structs.
//! Environment variables are only read by [`HarnessConfig::from_env`], a thin
//! translation layer kept out of the core so tests never have to mutate the
//! process environment.
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `GRAPHQL_ENDPOINT` | `graphql.endpoint` |
//! | `GRAPHQL_WS_ENDPOINT` | `graphql.ws_endpoint` |
//! | `ARTNET_LISTEN_ADDRESS` | IP part of `capture.bind_addr` |
//! | `ARTNET_PORT` | port part of `capture.bind_addr` |
//! | `ARTNET_TOLERANCE` | `compare.tolerance` |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::artnet::ARTNET_PORT;
use crate::{HarnessError, Result};

pub const ENV_GRAPHQL_ENDPOINT: &str = "GRAPHQL_ENDPOINT";
pub const ENV_GRAPHQL_WS_ENDPOINT: &str = "GRAPHQL_WS_ENDPOINT";
pub const ENV_ARTNET_LISTEN_ADDRESS: &str = "ARTNET_LISTEN_ADDRESS";
pub const ENV_ARTNET_PORT: &str = "ARTNET_PORT";
pub const ENV_ARTNET_TOLERANCE: &str = "ARTNET_TOLERANCE";

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Lighting server GraphQL endpoints
    pub graphql: GraphqlConfig,

    /// Art-Net capture socket
    pub capture: CaptureConfig,

    /// Frame comparison defaults
    pub compare: CompareConfig,
}

/// Art-Net capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Local address the receiver binds
    pub bind_addr: SocketAddr,

    /// Upper bound on a single socket read before the loop re-checks for shutdown
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), ARTNET_PORT),
            read_timeout: Duration::from_millis(100),
        }
    }
}

impl CaptureConfig {
    /// Capture on `127.0.0.1:port`; port 0 picks a free port.
    pub fn loopback(port: u16) -> Self {
        Self { bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port), ..Self::default() }
    }
}

/// GraphQL endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphqlConfig {
    /// HTTP endpoint for queries and mutations
    pub endpoint: String,

    /// WebSocket endpoint for subscriptions
    pub ws_endpoint: String,

    /// Per-request timeout, also used for the subscription handshake
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/graphql".to_string(),
            ws_endpoint: "ws://localhost:4000/graphql".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Defaults for asserting captured output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Per-channel tolerance passed to [`crate::FrameComparator`]
    pub tolerance: u8,

    /// Time to let the server's fade engine settle before sampling (one 40Hz tick)
    #[serde(rename = "settle_ms", with = "millis")]
    pub settle: Duration,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self { tolerance: 0, settle: Duration::from_millis(25) }
    }
}

impl HarnessConfig {
    /// Parse a YAML document; missing sections and fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| HarnessError::parse("harness configuration YAML", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the capture engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capture.read_timeout.is_zero() {
            return Err(HarnessError::config("capture.read_timeout_ms", "must be at least 1"));
        }
        Ok(())
    }

    /// Read and parse a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::io(format!("reading {}", path.display()), e))?;
        debug!("Loaded harness configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    /// Defaults overridden by the entries of a map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Apply variable overrides on top of this configuration.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(endpoint) = get(ENV_GRAPHQL_ENDPOINT) {
            self.graphql.endpoint = endpoint;
        }
        if let Some(ws_endpoint) = get(ENV_GRAPHQL_WS_ENDPOINT) {
            self.graphql.ws_endpoint = ws_endpoint;
        }
        if let Some(address) = get(ENV_ARTNET_LISTEN_ADDRESS) {
            let ip = address.parse::<IpAddr>().map_err(|e| {
                HarnessError::config(ENV_ARTNET_LISTEN_ADDRESS, format!("'{}': {}", address, e))
            })?;
            self.capture.bind_addr.set_ip(ip);
        }
        if let Some(port) = get(ENV_ARTNET_PORT) {
            let port = port
                .parse::<u16>()
                .map_err(|e| HarnessError::config(ENV_ARTNET_PORT, format!("'{}': {}", port, e)))?;
            self.capture.bind_addr.set_port(port);
        }
        if let Some(tolerance) = get(ENV_ARTNET_TOLERANCE) {
            self.compare.tolerance = tolerance.parse::<u8>().map_err(|e| {
                HarnessError::config(ENV_ARTNET_TOLERANCE, format!("'{}': {}", tolerance, e))
            })?;
        }

        Ok(self)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_match_conventional_ports() {
        let config = HarnessConfig::default();
        assert_eq!(config.capture.bind_addr.port(), 6454);
        assert!(config.capture.bind_addr.ip().is_unspecified());
        assert_eq!(config.capture.read_timeout, Duration::from_millis(100));
        assert_eq!(config.graphql.endpoint, "http://localhost:4000/graphql");
        assert_eq!(config.compare.tolerance, 0);
    }

    #[test]
    fn environment_overrides_apply() {
        let config = HarnessConfig::from_map(&vars(&[
            (ENV_GRAPHQL_ENDPOINT, "http://lights.local:4001/graphql"),
            (ENV_ARTNET_LISTEN_ADDRESS, "127.0.0.1"),
            (ENV_ARTNET_PORT, "16454"),
            (ENV_ARTNET_TOLERANCE, " 3 "),
        ]))
        .unwrap();

        assert_eq!(config.graphql.endpoint, "http://lights.local:4001/graphql");
        assert_eq!(config.graphql.ws_endpoint, GraphqlConfig::default().ws_endpoint);
        assert_eq!(config.capture.bind_addr, "127.0.0.1:16454".parse().unwrap());
        assert_eq!(config.compare.tolerance, 3);
    }

    #[test]
    fn empty_variables_are_ignored() {
        let config = HarnessConfig::from_map(&vars(&[(ENV_ARTNET_PORT, "")])).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn zero_read_timeout_is_rejected() {
        let err = HarnessConfig::from_yaml_str("capture:\n  read_timeout_ms: 0\n").unwrap_err();
        assert!(
            matches!(err, HarnessError::Config { ref key, .. } if key == "capture.read_timeout_ms"),
            "got {err:?}"
        );

        let config = HarnessConfig::from_yaml_str("capture:\n  read_timeout_ms: 1\n").unwrap();
        assert_eq!(config.capture.read_timeout, Duration::from_millis(1));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = HarnessConfig::from_map(&vars(&[(ENV_ARTNET_PORT, "70000")])).unwrap_err();
        assert!(matches!(err, HarnessError::Config { ref key, .. } if key == ENV_ARTNET_PORT));

        let err = HarnessConfig::from_map(&vars(&[(ENV_ARTNET_TOLERANCE, "-1")])).unwrap_err();
        assert!(err.to_string().contains(ENV_ARTNET_TOLERANCE));

        let err = HarnessConfig::from_map(&vars(&[(ENV_ARTNET_LISTEN_ADDRESS, "nope")])).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let yaml = r#"
capture:
  bind_addr: "127.0.0.1:0"
  read_timeout_ms: 50
compare:
  tolerance: 2
"#;
        let config = HarnessConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.capture.bind_addr.port(), 0);
        assert_eq!(config.capture.read_timeout, Duration::from_millis(50));
        assert_eq!(config.compare.tolerance, 2);
        assert_eq!(config.compare.settle, Duration::from_millis(25));
        assert_eq!(config.graphql, GraphqlConfig::default());
    }

    #[test]
    fn yaml_roundtrip_preserves_durations() {
        let mut config = HarnessConfig::default();
        config.graphql.request_timeout = Duration::from_millis(2_500);

        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        assert!(yaml.contains("request_timeout_ms: 2500"));
        assert_eq!(HarnessConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = HarnessConfig::from_yaml_str("capture: [not, a, map]").unwrap_err();
        assert!(matches!(err, HarnessError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = HarnessConfig::from_yaml_file("/nonexistent/lightcheck.yaml").unwrap_err();
        assert!(matches!(err, HarnessError::Io { .. }));
    }
}
