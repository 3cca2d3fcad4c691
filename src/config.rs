//! Server and framer configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```
//! use ringhttp::config::ServerConfig;
//!
//! let json = r#"{ "limits": { "max_header_bytes": 16384 } }"#;
//! let config = ServerConfig::from_json_str(json).unwrap();
//! assert_eq!(config.limits.max_header_bytes, 16384);
//! assert_eq!(config.limits.max_request_line, 8192);
//! assert_eq!(config.bind_address, "127.0.0.1:8080");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Size limits applied while reading a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Longest accepted request line, terminator included.
    pub max_request_line: usize,
    /// Upper bound on the header block, summed over all header lines. Also
    /// bounds each individual line.
    pub max_header_bytes: usize,
    /// Bytes requested from the socket per refill while searching for a
    /// line terminator.
    pub refill_chunk: usize,
    /// Chunk size used to drain an unread request body.
    pub skip_chunk: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_request_line: 8192,
            max_header_bytes: 8192,
            refill_chunk: 1024,
            skip_chunk: 1024,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("max_request_line", self.max_request_line),
            ("max_header_bytes", self.max_header_bytes),
            ("refill_chunk", self.refill_chunk),
            ("skip_chunk", self.skip_chunk),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("limits.{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Settings for [`Server`](crate::server::Server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Connections served concurrently; further accepts wait for a slot.
    /// Bounded by [`Semaphore::MAX_PERMITS`].
    pub max_connections: usize,
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_owned(),
            max_connections: 1024,
            limits: Limits::default(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::Invalid("bind_address must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be > 0".into()));
        }
        if self.max_connections > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(format!(
                "max_connections must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }
        self.limits.validate()
    }
}
