//! Connection configuration types.

use std::sync::Arc;
use std::time::Duration;

/// Smallest chunk a partial fetch asks the server for.
pub const DEFAULT_MIN_CHUNK: u64 = 5000;

/// Largest partial-fetch response kept in memory.
pub const DEFAULT_CACHE_CEILING: usize = 64 * 1024 * 1024;

/// Largest literal accepted from the server.
pub const DEFAULT_MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    StartTls,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// IMAP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for each response read; `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Fail instead of continuing in plaintext when STARTTLS is refused.
    pub tls_required: bool,
    /// Trust configuration for TLS; webpki roots when `None`.
    pub tls_config: Option<Arc<rustls::ClientConfig>>,
    /// Minimum octet count per partial-fetch round trip.
    pub min_chunk: u64,
    /// Largest partial-fetch response the adapter will cache.
    pub cache_ceiling: usize,
    /// Largest literal the framing layer accepts.
    pub max_literal_size: usize,
}

impl Config {
    /// Creates a new configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    tls_required: bool,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    min_chunk: u64,
    cache_ceiling: usize,
    max_literal_size: usize,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(30),
            read_timeout: None,
            tls_required: false,
            tls_config: None,
            min_chunk: DEFAULT_MIN_CHUNK,
            cache_ceiling: DEFAULT_CACHE_CEILING,
            max_literal_size: DEFAULT_MAX_LITERAL_SIZE,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-response read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Makes a refused or failed STARTTLS a configuration error.
    #[must_use]
    pub const fn tls_required(mut self, required: bool) -> Self {
        self.tls_required = required;
        self
    }

    /// Uses the given rustls configuration instead of webpki roots.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Sets the partial-fetch minimum chunk. Zero is treated as one.
    #[must_use]
    pub const fn min_chunk(mut self, octets: u64) -> Self {
        self.min_chunk = if octets == 0 { 1 } else { octets };
        self
    }

    /// Sets the partial-fetch cache ceiling.
    #[must_use]
    pub const fn cache_ceiling(mut self, octets: usize) -> Self {
        self.cache_ceiling = octets;
        self
    }

    /// Sets the maximum literal size.
    #[must_use]
    pub const fn max_literal_size(mut self, octets: usize) -> Self {
        self.max_literal_size = octets;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            tls_required: self.tls_required,
            tls_config: self.tls_config,
            min_chunk: self.min_chunk,
            cache_ceiling: self.cache_ceiling,
            max_literal_size: self.max_literal_size,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::StartTls.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.min_chunk, 5000);
        assert!(config.read_timeout.is_none());
        assert!(!config.tls_required);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(1993)
            .security(Security::Implicit)
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(5))
            .cache_ceiling(1024)
            .build();

        assert_eq!(config.port, 1993);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.cache_ceiling, 1024);
    }

    #[test]
    fn test_config_builder_default_port() {
        let config = Config::builder("imap.example.com")
            .security(Security::StartTls)
            .tls_required(true)
            .build();

        assert_eq!(config.port, 143);
        assert!(config.tls_required);
    }

    #[test]
    fn test_zero_min_chunk_is_clamped() {
        let config = Config::builder("h").min_chunk(0).build();
        assert_eq!(config.min_chunk, 1);
    }
}
