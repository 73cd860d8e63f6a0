//! Server configuration.

use std::time::Duration;

use pairlink_core::Limits;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address `serve` binds (`host:port`)
    pub addr: String,
    /// Payload limit, connection deadline and handler deadline
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: DEFAULT_ADDR.to_owned(), limits: Limits::default() }
    }
}

impl ServerConfig {
    /// Configuration listening on `addr` with default limits.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), ..Self::default() }
    }

    /// Override limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Override the body limit.
    #[must_use]
    pub fn with_body_limit(mut self, body: usize) -> Self {
        self.limits = self.limits.with_body(body);
        self
    }

    /// Override the connection deadline.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.limits = self.limits.with_connection_timeout(timeout);
        self
    }

    /// Override the handler deadline.
    #[must_use]
    pub fn with_handle_timeout(mut self, timeout: Duration) -> Self {
        self.limits = self.limits.with_handle_timeout(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_touch_only_their_field() {
        let config = ServerConfig::new("0.0.0.0:9000")
            .with_body_limit(4096)
            .with_handle_timeout(Duration::from_secs(1));

        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.limits.body, 4096);
        assert_eq!(config.limits.timeouts.handle, Duration::from_secs(1));
        assert_eq!(config.limits.timeouts.connection, Duration::from_millis(250));
    }
}
