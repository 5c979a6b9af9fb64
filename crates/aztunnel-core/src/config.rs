//! Relay engine configuration.

use std::time::Duration;

/// Tuning knobs for the relay data path.
///
/// Defaults match the tunnel agent's expectations; environment variables
/// (`AZTUNNEL_*`) override individual knobs without a config file.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket ping cadence. Keeps intermediaries from dropping an idle
    /// tunnel; does not bound total connection duration.
    pub ping_interval: Duration,
    /// Frames buffered per direction before the producer suspends.
    pub channel_capacity: usize,
    /// Socket read buffer size in bytes.
    pub read_buffer_size: usize,
    /// Local address the socket server binds to.
    pub bind_host: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            channel_capacity: 64,
            read_buffer_size: 16 * 1024,
            bind_host: "127.0.0.1".to_string(),
        }
    }
}

impl RelayConfig {
    /// Defaults with `AZTUNNEL_PING_INTERVAL_SECS` and
    /// `AZTUNNEL_CHANNEL_CAPACITY` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var("AZTUNNEL_PING_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                config.ping_interval = Duration::from_secs(secs);
            }
        }
        if let Ok(val) = std::env::var("AZTUNNEL_CHANNEL_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.channel_capacity = capacity;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ping_interval_is_30s() {
        let config = RelayConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(30));
    }

    #[test]
    fn default_read_buffer_is_16k() {
        let config = RelayConfig::default();
        assert_eq!(config.read_buffer_size, 16 * 1024);
    }

    #[test]
    fn default_channels_are_bounded() {
        let config = RelayConfig::default();
        assert_eq!(config.channel_capacity, 64);
    }
}
