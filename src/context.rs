//! The unit of work flowing through the pipeline.
//!
//! Callers describe an event with [`LogEvent`]. The logger resolves it into
//! a [`Context`]: the payload plus the configuration snapshot and request
//! options it will be delivered with. Contexts are queued, transformed by
//! middleware, dispatched once and then dropped.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::{self, Config, ConfigError, ConfigOverrides};
use crate::message::Message;

/// Header carrying the collector token.
pub const AUTHORIZATION: &str = "Authorization";
/// Header naming the body encoding.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Event timestamp supplied by the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventTime {
    /// Raw epoch value in seconds or milliseconds, normalised on serialisation.
    Epoch(f64),
    /// An exact instant.
    At(DateTime<Utc>),
}

impl From<DateTime<Utc>> for EventTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self::At(value)
    }
}

impl From<f64> for EventTime {
    fn from(value: f64) -> Self {
        Self::Epoch(value)
    }
}

impl From<i64> for EventTime {
    fn from(value: i64) -> Self {
        Self::Epoch(value as f64)
    }
}

/// Optional envelope fields carried alongside an event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub time: Option<EventTime>,
    pub host: Option<String>,
    pub source: Option<String>,
    pub sourcetype: Option<String>,
    pub index: Option<String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, time: impl Into<EventTime>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_sourcetype(mut self, sourcetype: impl Into<String>) -> Self {
        self.sourcetype = Some(sourcetype.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Fill the unset fields of `self` from `defaults`.
    pub fn merged_over(self, defaults: &Metadata) -> Metadata {
        Metadata {
            time: self.time.or(defaults.time),
            host: self.host.or_else(|| defaults.host.clone()),
            source: self.source.or_else(|| defaults.source.clone()),
            sourcetype: self.sourcetype.or_else(|| defaults.sourcetype.clone()),
            index: self.index.or_else(|| defaults.index.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Caller adjustments to the outbound request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOverrides {
    /// Target URL; defaults to the resolved configuration's URL.
    pub url: Option<String>,
    pub json: Option<bool>,
    pub strict_ssl: Option<bool>,
    pub headers: BTreeMap<String, String>,
}

/// Transport options attached to a context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOptions {
    pub url: String,
    /// Send a JSON body; `false` means a raw form-encoded body.
    pub json: bool,
    /// Verify the collector's TLS certificate.
    pub strict_ssl: bool,
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    /// Build options for `config`, layering the caller's adjustments on top.
    ///
    /// The `Authorization` header always reflects the configuration token.
    pub fn for_config(config: &Config, overrides: &RequestOverrides) -> Self {
        let mut options = Self {
            url: overrides.url.clone().unwrap_or_else(|| config.url()),
            json: overrides.json.unwrap_or(true),
            strict_ssl: overrides.strict_ssl.unwrap_or(false),
            headers: overrides.headers.clone(),
        };
        options.set_header(AUTHORIZATION, config.authorization());
        options
    }

    /// Insert `value`, replacing any header whose name matches case-insensitively.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_owned(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An event as described by the caller of `send`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogEvent {
    pub message: Message,
    /// Severity label; the configuration level applies when unset.
    pub severity: Option<String>,
    pub metadata: Metadata,
    /// Per-event configuration layered over the logger's configuration.
    pub config: ConfigOverrides,
    pub request: RequestOverrides,
}

impl LogEvent {
    pub fn new(message: impl Into<Message>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_config(mut self, config: ConfigOverrides) -> Self {
        self.config = config;
        self
    }

    pub fn with_request(mut self, request: RequestOverrides) -> Self {
        self.request = request;
        self
    }
}

/// One pending event plus everything needed to deliver it.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    pub message: Message,
    pub severity: Option<String>,
    pub metadata: Metadata,
    pub config: Config,
    pub request_options: RequestOptions,
}

impl Context {
    /// Resolve `event` against the logger configuration `base`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the event's overrides do not resolve.
    pub fn initialize(event: LogEvent, base: &Config) -> Result<Self, ConfigError> {
        let config = config::resolve(Some(base), &event.config)?;
        let request_options = RequestOptions::for_config(&config, &event.request);
        Ok(Self {
            message: event.message,
            severity: event.severity,
            metadata: event.metadata,
            config,
            request_options,
        })
    }

    /// Stand-in flushed when auto-flush finds the queue empty.
    ///
    /// The collector answers it with its "no data" response.
    pub fn placeholder(config: &Config) -> Self {
        Self::for_message(Message::default(), config)
    }

    /// Synthetic context carrying a pre-serialised batch as its message.
    pub fn batch(payload: String, config: &Config) -> Self {
        let mut context = Self::for_message(Message::Text(payload), config);
        context.request_options.json = false;
        context
    }

    fn for_message(message: Message, config: &Config) -> Self {
        Self {
            message,
            severity: None,
            metadata: Metadata::default(),
            config: config.clone(),
            request_options: RequestOptions::for_config(config, &RequestOverrides::default()),
        }
    }

    /// Effective severity: the explicit one or the configuration level.
    pub fn severity(&self) -> &str {
        self.severity.as_deref().unwrap_or(&self.config.level)
    }

    /// Re-run configuration validation over this context's snapshot.
    pub(crate) fn revalidated(mut self) -> Result<Self, (ConfigError, Self)> {
        match config::revalidate(&self.config) {
            Ok(config) => {
                self.config = config;
                Ok(self)
            }
            Err(err) => Err((err, self)),
        }
    }
}
