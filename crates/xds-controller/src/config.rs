//! Controller configuration.

use serde::{Deserialize, Serialize};
use xds_core::{XdsError, XdsResult};

/// How the coordinator publishes snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// One snapshot store; every publish carries all six kinds.
    Shared,
    /// Snapshot store for everything but endpoints, plus an incremental
    /// endpoint store behind a multiplexer.
    #[default]
    Split,
}

/// Address of the static stats and health listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsListenerConfig {
    /// Bind address.
    pub address: String,
    /// Bind port.
    pub port: u32,
}

impl Default for StatsListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8002,
        }
    }
}

/// Values rendered into the runtime layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Requests an HTTP/2 connection may process per I/O cycle.
    pub max_requests_per_io_cycle: Option<u32>,
    /// Regex program size above which configuration is rejected.
    pub max_regex_program_size: u32,
    /// Regex program size above which a warning is logged.
    pub warn_regex_program_size: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            max_requests_per_io_cycle: None,
            max_regex_program_size: 1 << 20,
            warn_regex_program_size: 1000,
        }
    }
}

/// Configuration for the caches and the snapshot coordinator.
///
/// # Example
///
/// ```rust
/// use xds_controller::{CacheMode, ControllerConfig};
///
/// let config = ControllerConfig::from_json(r#"{ "node_id": "edge", "cache_mode": "shared" }"#).unwrap();
/// assert_eq!(config.node_id, "edge");
/// assert_eq!(config.cache_mode, CacheMode::Shared);
/// assert_eq!(config.watch_buffer_size, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Node id hashed into the key snapshots are published under.
    pub node_id: String,
    /// Publishing design.
    pub cache_mode: CacheMode,
    /// Static stats listener; `None` disables it.
    pub stats_listener: Option<StatsListenerConfig>,
    /// Upstream cluster the stats listener routes to.
    pub admin_cluster: String,
    /// Runtime layer values.
    pub runtime: RuntimeSettings,
    /// Pending updates each watch channel holds.
    pub watch_buffer_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            node_id: "contour".to_string(),
            cache_mode: CacheMode::default(),
            stats_listener: Some(StatsListenerConfig::default()),
            admin_cluster: "envoy-admin".to_string(),
            runtime: RuntimeSettings::default(),
            watch_buffer_size: 16,
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> XdsResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| XdsError::Configuration(format!("invalid controller config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration.
    pub fn validate(&self) -> XdsResult<()> {
        if self.node_id.is_empty() {
            return Err(XdsError::Configuration("node_id must not be empty".to_string()));
        }
        if let Some(stats) = &self.stats_listener {
            if stats.port == 0 || stats.port > u32::from(u16::MAX) {
                return Err(XdsError::Configuration(format!(
                    "stats listener port {} out of range",
                    stats.port
                )));
            }
            if stats.address.is_empty() {
                return Err(XdsError::Configuration(
                    "stats listener address must not be empty".to_string(),
                ));
            }
            if self.admin_cluster.is_empty() {
                return Err(XdsError::Configuration(
                    "admin_cluster must not be empty when the stats listener is enabled"
                        .to_string(),
                ));
            }
        }
        if self.watch_buffer_size == 0 {
            return Err(XdsError::Configuration(
                "watch_buffer_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
