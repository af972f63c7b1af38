use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Role an endpoint plays on a channel (§3 "Channel configuration").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Server,
}

/// Whether a channel uses two sockets (one per direction) or a single
/// socket for both (§4.2 "Modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    DualPort,
    UnifiedPort,
}

/// Retry policy applied by the endpoint when `auto_reconnect` is set
/// (§4.2 "Failure semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            delay_ms: 2_000,
        }
    }
}

/// The resolved connection profile for one channel (§6 "Channel
/// configuration document").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub host: String,
    pub send_port: Option<u16>,
    pub receive_port: Option<u16>,
    pub unified_port: Option<u16>,
    pub server_mode: bool,
    pub dual_channel: bool,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub auto_reconnect: bool,
}

impl ConnectionProfile {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            delay_ms: self.retry_delay_ms,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.dual_channel {
            Mode::DualPort
        } else {
            Mode::UnifiedPort
        }
    }

    pub fn role(&self) -> Role {
        if self.server_mode {
            Role::Server
        } else {
            Role::Client
        }
    }
}

/// One declared channel, as read from the channel configuration document
/// (§3 "Channel configuration", §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub institution_id: String,
    pub active: bool,
    pub profile: ConnectionProfile,
    /// Optional reference to a named message schema (generic, non-ISO-8583
    /// field addressing); `None` means the default ISO-8583 numeric schema.
    pub schema_ref: Option<String>,
}

/// A full configuration snapshot, as emitted by the channel configuration
/// registry on startup or full reload (§4.4 "Inputs").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub connections: Vec<ChannelConfig>,
}

/// A single-channel delta update (§4.4 "Inputs").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfigDelta {
    Added(ChannelConfig),
    Updated(ChannelConfig),
    Removed { channel_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ConnectionProfile {
        ConnectionProfile {
            host: "127.0.0.1".into(),
            send_port: Some(5000),
            receive_port: Some(5001),
            unified_port: None,
            server_mode: false,
            dual_channel: true,
            connect_timeout_ms: 3_000,
            response_timeout_ms: 5_000,
            heartbeat_interval_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            auto_reconnect: true,
        }
    }

    #[test]
    fn mode_and_role_derive_from_flags() {
        let p = profile();
        assert_eq!(p.mode(), Mode::DualPort);
        assert_eq!(p.role(), Role::Client);

        let mut unified = profile();
        unified.dual_channel = false;
        unified.server_mode = true;
        assert_eq!(unified.mode(), Mode::UnifiedPort);
        assert_eq!(unified.role(), Role::Server);
    }

    #[test]
    fn durations_convert_from_millis() {
        let p = profile();
        assert_eq!(p.connect_timeout(), Duration::from_secs(3));
        assert_eq!(p.heartbeat_interval(), Duration::from_secs(30));
    }

    #[test]
    fn serde_roundtrip_channel_config() {
        let cfg = ChannelConfig {
            channel_id: "A".into(),
            institution_id: "FISC".into(),
            active: true,
            profile: profile(),
            schema_ref: None,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ChannelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
