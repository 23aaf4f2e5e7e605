//! Resolved configuration snapshot and its error type.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Library identifier used when no `name` is configured.
pub const DEFAULT_NAME: &str = concat!("hec-logging/", env!("CARGO_PKG_VERSION"));
/// Default collector host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default collector endpoint path.
pub const DEFAULT_PATH: &str = "/services/collector/event/1.0";
/// Default collector port.
pub const DEFAULT_PORT: u16 = 8088;
/// Default severity applied to events that do not carry one.
pub const DEFAULT_LEVEL: &str = "info";
/// Lowest accepted collector port.
pub const MIN_PORT: i64 = 1000;
/// Highest accepted collector port.
pub const MAX_PORT: i64 = 65535;

/// Scheme used to reach the collector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Https,
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }

    /// Map the legacy `useHTTPS` flag onto a protocol.
    pub fn from_use_https(use_https: bool) -> Self {
        if use_https { Self::Https } else { Self::Http }
    }

    pub(crate) fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "https" => Some(Self::Https),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, fully resolved logger configuration.
///
/// Values are produced by [`resolve`](super::resolve) and never mutated in
/// place by the library; a per-event override yields a fresh snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Collector token sent as `Authorization: Splunk <token>`.
    pub token: String,
    /// Identifier of the sending library.
    pub name: String,
    pub host: String,
    pub path: String,
    pub protocol: Protocol,
    pub port: u16,
    /// Severity applied to events without an explicit one.
    pub level: String,
    /// Flush every event as soon as it is sent.
    pub auto_flush: bool,
    /// Retry budget handed to the transport for connection failures.
    pub max_retries: u32,
    /// Flush a non-empty queue on this interval (manual mode only).
    pub batch_interval: Option<Duration>,
    /// Flush once this many events are queued (manual mode only).
    pub max_batch_count: Option<usize>,
    /// Flush once the queued bodies reach this many bytes (manual mode only).
    pub max_batch_size: Option<usize>,
}

impl Config {
    /// Full collector URL, e.g. `https://localhost:8088/services/collector/event/1.0`.
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol, self.host, self.port, self.path
        )
    }

    /// Value of the `Authorization` header derived from the token.
    pub fn authorization(&self) -> String {
        format!("Splunk {}", self.token)
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No override configuration was supplied.
    #[error("configuration is required")]
    Missing,
    /// The supplied configuration was not a mapping.
    #[error("configuration must be an object")]
    NotAnObject,
    /// Neither base nor override carried a usable token.
    #[error("configuration must include a non-empty token")]
    MissingToken,
    /// A token was supplied with a non-string value.
    #[error("configuration token must be a string")]
    TokenNotString,
    /// The port could not be parsed as an integer.
    #[error("port {0:?} is not an integer")]
    PortNotInteger(String),
    /// The port parsed but lies outside the accepted range.
    #[error("port {0} is out of range [1000, 65535]")]
    PortOutOfRange(i64),
    /// The connection URL could not be parsed.
    #[error("invalid connection url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// The connection URL used a scheme other than http or https.
    #[error("unsupported protocol {0:?}")]
    UnsupportedProtocol(String),
    /// Any other structural problem found while decoding a JSON configuration.
    #[error("malformed configuration: {0}")]
    Malformed(String),
}
