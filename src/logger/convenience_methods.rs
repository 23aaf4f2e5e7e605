//! Severity shortcuts and default metadata.
//!
//! Each shortcut builds a [`LogEvent`] with a fixed severity and sends it
//! through [`HecLogger::send`]. Metadata set with
//! [`set_metadata`](HecLogger::set_metadata) fills any field the event
//! leaves unset.

use crate::config::ConfigError;
use crate::context::{LogEvent, Metadata};
use crate::dispatcher::{DeliveryError, Outcome};
use crate::level::Level;
use crate::message::Message;

use super::HecLogger;

impl HecLogger {
    /// Send `message` with an arbitrary severity label.
    pub fn log(
        &self,
        severity: impl Into<String>,
        message: impl Into<Message>,
    ) -> Result<(), ConfigError> {
        self.send(LogEvent::new(message).with_severity(severity))
    }

    /// Like [`log`](Self::log), reporting the result to `callback`.
    pub fn log_with<F>(
        &self,
        severity: impl Into<String>,
        message: impl Into<Message>,
        callback: F,
    ) -> Result<(), ConfigError>
    where
        F: FnOnce(Result<Outcome, DeliveryError>) + Send + 'static,
    {
        self.send_with(LogEvent::new(message).with_severity(severity), callback)
    }

    pub fn debug(&self, message: impl Into<Message>) -> Result<(), ConfigError> {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: impl Into<Message>) -> Result<(), ConfigError> {
        self.log(Level::Info, message)
    }

    pub fn warn(&self, message: impl Into<Message>) -> Result<(), ConfigError> {
        self.log(Level::Warn, message)
    }

    pub fn error(&self, message: impl Into<Message>) -> Result<(), ConfigError> {
        self.log(Level::Error, message)
    }

    /// Replace the default metadata applied to every later event.
    pub fn set_metadata(&self, metadata: Metadata) {
        *self.inner.default_metadata.write() = metadata;
    }

    pub fn clear_metadata(&self) {
        *self.inner.default_metadata.write() = Metadata::default();
    }

    pub fn metadata(&self) -> Metadata {
        self.inner.default_metadata.read().clone()
    }
}
