//! Bridge from the `log` facade into a [`HecLogger`].
//!
//! [`HecLogAdapter`] implements [`log::Log`] and forwards every enabled
//! record as an event whose severity is the mapped record level and whose
//! `source` is the record target. Records from this crate and from the HTTP
//! stack beneath it are skipped; forwarding them would feed the logger its
//! own delivery diagnostics.

use std::sync::Arc;
use std::time::Duration;

use log::{LevelFilter, Metadata as LogMetadata, Record, SetLoggerError};

use crate::context::{LogEvent, Metadata};
use crate::level::Level;
use crate::logger::HecLogger;

const SKIPPED_TARGETS: &[&str] = &["hec_logging", "ureq", "native_tls", "rustls"];
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

fn is_skipped(target: &str) -> bool {
    SKIPPED_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// `log::Log` implementation sending records through a shared logger.
pub struct HecLogAdapter {
    logger: Arc<HecLogger>,
    max_level: LevelFilter,
}

impl HecLogAdapter {
    pub fn new(logger: Arc<HecLogger>) -> Self {
        Self {
            logger,
            max_level: LevelFilter::Info,
        }
    }

    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    fn event_for(record: &Record<'_>) -> LogEvent {
        LogEvent::new(record.args().to_string())
            .with_severity(Level::from(record.level()))
            .with_metadata(Metadata::new().with_source(record.target()))
    }
}

impl log::Log for HecLogAdapter {
    fn enabled(&self, metadata: &LogMetadata<'_>) -> bool {
        metadata.level() <= self.max_level && !is_skipped(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Err(err) = self.logger.send(Self::event_for(record)) {
            eprintln!("hec_logging: dropping record from {:?}: {err}", record.target());
        }
    }

    /// Push out a pending manual batch and wait briefly for the worker.
    fn flush(&self) {
        if !self.logger.config().auto_flush {
            self.logger.flush();
        }
        let _ = self.logger.wait_for_dispatch(FLUSH_TIMEOUT);
    }
}

/// Install `logger` as the process-wide `log` backend.
///
/// # Errors
///
/// Fails when another global logger is already installed.
pub fn install_global_logger(
    logger: Arc<HecLogger>,
    max_level: LevelFilter,
) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(
        HecLogAdapter::new(logger).with_max_level(max_level),
    ))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::test_utils::RecordingTransport;
    use log::Log;
    use rstest::rstest;

    #[rstest]
    #[case("hec_logging", true)]
    #[case("hec_logging::dispatcher", true)]
    #[case("ureq::unit", true)]
    #[case("hec_logging_demo", false)]
    #[case("my_app::db", false)]
    fn internal_targets_are_skipped(#[case] target: &str, #[case] skipped: bool) {
        assert_eq!(is_skipped(target), skipped);
    }

    #[rstest]
    fn records_become_events() {
        let transport = Arc::new(RecordingTransport::new());
        let logger = HecLogger::builder(ConfigOverrides::new().with_token("t"))
            .with_transport(Arc::clone(&transport))
            .build()
            .expect("build");
        let adapter = HecLogAdapter::new(Arc::new(logger)).with_max_level(LevelFilter::Debug);

        adapter.log(
            &Record::builder()
                .args(format_args!("cache miss"))
                .level(log::Level::Warn)
                .target("my_app::cache")
                .build(),
        );
        adapter.log(
            &Record::builder()
                .args(format_args!("too chatty"))
                .level(log::Level::Trace)
                .target("my_app::cache")
                .build(),
        );
        adapter.flush();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value =
            serde_json::from_str(requests[0].body.as_str()).expect("json");
        assert_eq!(body["source"], "my_app::cache");
        assert_eq!(body["event"]["severity"], "warn");
        assert_eq!(body["event"]["message"], "cache miss");
    }
}
