//! Transport configuration of an [`AppServer`](crate::AppServer).
//!
//! The configuration can be built in code:
//!
//! ```
//! use std::time::Duration;
//! use micro_dispatch::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .addr("0.0.0.0:8080")
//!     .read_timeout(Duration::from_secs(1))
//!     .write_timeout(Duration::from_secs(5))
//!     .max_header_bytes(1 << 20)
//!     .max_body_bytes(8 << 20)
//!     .build();
//! assert_eq!(config.addr(), "0.0.0.0:8080");
//! ```
//!
//! or deserialized, durations being given in milliseconds:
//!
//! ```toml
//! addr = "0.0.0.0:8080"
//! read_timeout_ms = 1000
//! write_timeout_ms = 5000
//! max_header_bytes = 1048576
//! max_body_bytes = 8388608
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_HEADER_BYTES: usize = 1 << 20;
const DEFAULT_MAX_BODY_BYTES: usize = 4 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    addr: String,
    #[serde(rename = "read_timeout_ms", deserialize_with = "duration_ms")]
    read_timeout: Duration,
    #[serde(rename = "write_timeout_ms", deserialize_with = "duration_ms")]
    write_timeout: Duration,
    max_header_bytes: usize,
    max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder { config: Self::default() }
    }

    /// The address the server listens to, eg: `0.0.0.0:80`
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Deadline for reading one request, header and body.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Deadline for writing one response.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Max number of bytes of a request header.
    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    /// Max announced `Content-Length` of a request body.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.config.addr = addr.into();
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.config.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn write_timeout(mut self, write_timeout: Duration) -> Self {
        self.config.write_timeout = write_timeout;
        self
    }

    #[must_use]
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.config.max_header_bytes = max_header_bytes;
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.config.max_body_bytes = max_body_bytes;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

fn duration_ms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), DEFAULT_ADDR);
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_header_bytes(), 1 << 20);
        assert_eq!(config.max_body_bytes(), 4 << 20);
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{"addr": "0.0.0.0:80", "read_timeout_ms": 1000, "max_header_bytes": 4096, "max_body_bytes": 65536}"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.addr(), "0.0.0.0:80");
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.write_timeout(), DEFAULT_WRITE_TIMEOUT);
        assert_eq!(config.max_header_bytes(), 4096);
        assert_eq!(config.max_body_bytes(), 65536);
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder().addr("[::1]:9000").write_timeout(Duration::from_millis(250)).build();
        assert_eq!(config.addr(), "[::1]:9000");
        assert_eq!(config.write_timeout(), Duration::from_millis(250));
        assert_eq!(config.read_timeout(), DEFAULT_READ_TIMEOUT);
    }
}
