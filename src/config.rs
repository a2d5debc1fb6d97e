// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::time::Duration;

use crate::constants::DEFAULT_PORT;

/// Arm mode for partition arming commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    /// Full/away arm (`030`)
    Away,
    /// Stay/home arm (`031`)
    Stay,
    /// Arm with zero entry delay (`032`)
    NoEntryDelay,
}

/// Configuration for connecting to an Envisalink module.
#[derive(Debug, Clone)]
pub struct TpiConfig {
    /// Envisalink host name or IP address
    pub host: String,
    /// TPI port (default: 4025)
    pub port: u16,
    /// TPI password, the same as the module's local web page password (default: "user")
    pub password: String,
    /// Installer/user code sent for disarming and on `900` code requests
    pub user_code: String,
    /// TCP dial timeout in milliseconds (default: 1000)
    pub dial_timeout_ms: u64,
    /// How long `send` waits for an Ack or error response (default: 1000)
    pub response_timeout_ms: u64,
    /// Upper bound on the post-login status sync in milliseconds (default: 15000)
    pub sync_timeout_ms: u64,
    /// Whether to set the panel clock from local time after connecting
    pub set_clock_on_connect: bool,
    /// Capacity of the broadcast event channel
    pub event_capacity: usize,
}

impl Default for TpiConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.100".to_string(),
            port: DEFAULT_PORT,
            password: "user".to_string(),
            user_code: String::new(),
            dial_timeout_ms: 1000,
            response_timeout_ms: 1000,
            sync_timeout_ms: 15000,
            set_clock_on_connect: true,
            event_capacity: 256,
        }
    }
}

impl TpiConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> TpiConfigBuilder {
        TpiConfigBuilder::default()
    }

    /// `host:port` as passed to the socket dialer.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

/// Builder for TpiConfig.
#[derive(Debug, Clone, Default)]
pub struct TpiConfigBuilder {
    config: TpiConfig,
}

impl TpiConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn user_code(mut self, code: impl Into<String>) -> Self {
        self.config.user_code = code.into();
        self
    }

    pub fn dial_timeout_ms(mut self, ms: u64) -> Self {
        self.config.dial_timeout_ms = ms;
        self
    }

    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.config.response_timeout_ms = ms;
        self
    }

    pub fn sync_timeout_ms(mut self, ms: u64) -> Self {
        self.config.sync_timeout_ms = ms;
        self
    }

    pub fn set_clock_on_connect(mut self, enabled: bool) -> Self {
        self.config.set_clock_on_connect = enabled;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> TpiConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TpiConfig::default();
        assert_eq!(config.port, 4025);
        assert_eq!(config.password, "user");
        assert_eq!(config.response_timeout(), Duration::from_secs(1));
        assert_eq!(config.dial_timeout(), Duration::from_secs(1));
        assert_eq!(config.sync_timeout(), Duration::from_secs(15));
        assert!(config.set_clock_on_connect);
    }

    #[test]
    fn test_config_builder() {
        let config = TpiConfig::builder()
            .host("10.0.0.24")
            .port(4026)
            .password("secret")
            .user_code("12345")
            .sync_timeout_ms(5000)
            .set_clock_on_connect(false)
            .build();

        assert_eq!(config.address(), "10.0.0.24:4026");
        assert_eq!(config.password, "secret");
        assert_eq!(config.user_code, "12345");
        assert_eq!(config.sync_timeout_ms, 5000);
        assert!(!config.set_clock_on_connect);
    }
}
