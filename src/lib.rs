//! Buffered delivery of log events to an HTTP Event Collector.
//!
//! A [`HecLogger`] resolves each event against its [`Config`], queues it and
//! flushes either immediately (auto-flush) or in batches. Flushed contexts
//! pass through a user [`MiddlewareChain`] before a worker thread posts them
//! through an [`HttpTransport`]. Delivery results arrive through per-call
//! callbacks; failures also reach the logger's [`ErrorHandler`].

pub mod config;
mod context;
pub mod dispatcher;
mod error_handler;
mod level;
#[cfg(feature = "log-compat")]
mod log_compat;
mod logger;
mod message;
pub mod middleware;
mod rate_limited_warner;
pub mod serialise;
#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use config::{Config, ConfigError, ConfigOverrides, PortValue, Protocol};
pub use context::{
    AUTHORIZATION, CONTENT_TYPE, Context, EventTime, LogEvent, Metadata, RequestOptions,
    RequestOverrides,
};
pub use dispatcher::{
    DeliveryCallback, DeliveryError, Dispatcher, HecResponse, HttpTransport, OutboundRequest,
    Outcome, RequestBody, TransportError, TransportResponse, UreqTransport,
};
pub use error_handler::{ErrorHandler, LogErrorHandler};
pub use level::Level;
#[cfg(feature = "log-compat")]
pub use log_compat::{HecLogAdapter, install_global_logger};
pub use logger::{BuildError, HecLogger, HecLoggerBuilder};
pub use message::Message;
pub use middleware::{ChainFailure, Middleware, MiddlewareChain, MiddlewareError, MiddlewareFailure};
pub use rate_limited_warner::RateLimitedWarner;
pub use serialise::{BodyError, EventBody, make_body, make_body_at, serialise_batch, serialise_body};
