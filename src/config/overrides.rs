//! Partial configuration layer supplied by callers.
//!
//! [`ConfigOverrides`] mirrors every [`Config`](super::Config) field as an
//! optional value and adds the `url` shorthand. Overrides are merged onto a
//! base snapshot by [`resolve`](super::resolve); they deserialise from JSON
//! using the camelCase keys understood by other collector clients.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::types::{ConfigError, Protocol};

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

macro_rules! string_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: impl Into<String>) -> Self {
            self.$field = Some(value.into());
            self
        }
    };
}

/// Port exactly as a caller supplied it, prior to validation.
///
/// JSON configurations frequently carry the port as a string, so both
/// numeric and textual forms are accepted and checked during resolution.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<u16> for PortValue {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for PortValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PortValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for PortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PortValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Optional configuration values layered over a base [`Config`](super::Config).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub token: Option<String>,
    pub name: Option<String>,
    pub host: Option<String>,
    #[serde(alias = "urlPath", alias = "url-path")]
    pub path: Option<String>,
    pub protocol: Option<Protocol>,
    /// Legacy boolean form of `protocol`; ignored when `protocol` is set.
    #[serde(rename = "useHTTPS")]
    pub use_https: Option<bool>,
    pub port: Option<PortValue>,
    pub level: Option<String>,
    pub auto_flush: Option<bool>,
    pub max_retries: Option<u32>,
    /// Interval in milliseconds.
    pub batch_interval: Option<u64>,
    pub max_batch_count: Option<usize>,
    pub max_batch_size: Option<usize>,
    /// Connection URL shorthand for protocol, host, port and path.
    pub url: Option<String>,
}

impl ConfigOverrides {
    /// Create an empty override layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode overrides from an untyped JSON value.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::NotAnObject`] when `value` is not a JSON object.
    /// * [`ConfigError::TokenNotString`] when a `token` key is present with a
    ///   non-string value.
    /// * [`ConfigError::Malformed`] for any other type mismatch.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = value else {
            return Err(ConfigError::NotAnObject);
        };
        if let Some(token) = map.get("token")
            && !token.is_string()
        {
            return Err(ConfigError::TokenNotString);
        }
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    string_setter!(
        #[doc = "Set the collector token."]
        with_token,
        token
    );
    string_setter!(
        #[doc = "Set the library identifier."]
        with_name,
        name
    );
    string_setter!(
        #[doc = "Set the collector host."]
        with_host,
        host
    );
    string_setter!(
        #[doc = "Set the collector endpoint path."]
        with_path,
        path
    );
    string_setter!(
        #[doc = "Set the default severity."]
        with_level,
        level
    );
    string_setter!(
        #[doc = "Set the connection URL shorthand."]
        with_url,
        url
    );
    option_setter!(
        #[doc = "Set the protocol used to reach the collector."]
        with_protocol,
        protocol,
        Protocol
    );
    option_setter!(
        #[doc = "Select HTTPS (`true`) or HTTP (`false`)."]
        with_use_https,
        use_https,
        bool
    );
    option_setter!(
        #[doc = "Enable or disable flushing on every send."]
        with_auto_flush,
        auto_flush,
        bool
    );
    option_setter!(
        #[doc = "Set the transport retry budget."]
        with_max_retries,
        max_retries,
        u32
    );
    option_setter!(
        #[doc = "Flush once this many events are queued."]
        with_max_batch_count,
        max_batch_count,
        usize
    );
    option_setter!(
        #[doc = "Flush once the queued bodies reach this many bytes."]
        with_max_batch_size,
        max_batch_size,
        usize
    );

    /// Set the collector port.
    pub fn with_port(mut self, port: impl Into<PortValue>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Flush a non-empty queue on the given interval.
    pub fn with_batch_interval(mut self, interval: Duration) -> Self {
        self.batch_interval = Some(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        self
    }
}
