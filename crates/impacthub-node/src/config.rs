//! Node configuration types

use impacthub_security::{AntiGamingConfig, RateLimitConfig};
use impacthub_voting::VotingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `IMPACTHUB__SERVER__ADDRESS`
pub const ENV_PREFIX: &str = "IMPACTHUB";

/// Complete node configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// HTTP API settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Voting rules
    #[serde(default)]
    pub voting: VotingConfig,

    /// Per-action quotas; a table here replaces the built-in rules
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Anti-gaming thresholds
    #[serde(default)]
    pub anti_gaming: AntiGamingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl NodeConfig {
    /// Load from an optional TOML file layered under `IMPACTHUB__*` variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Config file {:?} not found, using defaults", path);
            }
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: NodeConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engines cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        self.rate_limits.validate()?;
        self.server.address.parse::<std::net::SocketAddr>().map_err(|e| {
            anyhow::anyhow!("invalid server address {:?}: {}", self.server.address, e)
        })?;
        if self.anti_gaming.donation_multiplier <= 0.0 {
            anyhow::bail!("anti_gaming.donation_multiplier must be positive");
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// HTTP API settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_server_address")]
    pub address: String,

    /// Allow cross-origin requests
    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_server_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            cors: true,
        }
    }
}

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Metrics configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve `/metrics`
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
