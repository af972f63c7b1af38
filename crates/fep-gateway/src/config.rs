//! Gateway configuration document (§6 "External interfaces"): channel list
//! plus repository and logging settings, loaded from TOML.

use fep_core::ChannelConfig;
use serde::{Deserialize, Serialize};

fn default_worker_threads() -> usize {
    4
}

fn default_dedup_window_minutes() -> i64 {
    5
}

fn default_batch_concurrency() -> usize {
    16
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            worker_threads: default_worker_threads(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Only `"memory"` is implemented; the field exists so a future RDBMS
    /// or cluster-store backend can be selected without a config schema
    /// change (§6 "implementations may back onto RAM, an RDBMS, or a
    /// cluster store").
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_dedup_window_minutes")]
    pub dedup_window_minutes: i64,
}

fn default_backend() -> String {
    "memory".to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            backend: default_backend(),
            dedup_window_minutes: default_dedup_window_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// A `tracing_subscriber::EnvFilter` directive string, e.g. `"info"` or
    /// `"fep_pipeline=debug,fep_conn=info"`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { filter: default_log_filter() }
    }
}

/// Path to a validation rule document (§4.5.3), in either the line or JSON
/// surface; `fep_validate::load_engine` autodetects which.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    pub rules_path: Option<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig { rules_path: None }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl GatewayConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        let config: GatewayConfig = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let toml = r#"
            [[channels]]
            channel_id = "FISC-1"
            institution_id = "FISC"
            active = true
            [channels.profile]
            host = "127.0.0.1"
            send_port = 5000
            receive_port = 5001
            unified_port = 0
            server_mode = false
            dual_channel = true
            connect_timeout_ms = 3000
            response_timeout_ms = 5000
            heartbeat_interval_ms = 30000
            max_retries = 3
            retry_delay_ms = 1000
            auto_reconnect = true
        "#;
        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].channel_id, "FISC-1");
        assert_eq!(config.repository.backend, "memory");
        assert_eq!(config.runtime.worker_threads, 4);
    }
}
