//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use hec_logging::test_utils::{CollectingErrorHandler, RecordingTransport};
use hec_logging::{ConfigOverrides, HecLogger};

pub const WAIT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub logger: HecLogger,
    pub transport: Arc<RecordingTransport>,
    pub errors: CollectingErrorHandler,
}

pub fn harness(overrides: ConfigOverrides) -> Harness {
    harness_with(overrides, RecordingTransport::new())
}

pub fn harness_with(overrides: ConfigOverrides, transport: RecordingTransport) -> Harness {
    let transport = Arc::new(transport);
    let errors = CollectingErrorHandler::new();
    let logger = HecLogger::builder(overrides.with_token("integration-token"))
        .with_transport(Arc::clone(&transport))
        .with_error_handler(errors.clone())
        .build()
        .expect("build logger");
    Harness {
        logger,
        transport,
        errors,
    }
}

pub fn bodies(transport: &RecordingTransport) -> Vec<String> {
    transport
        .requests()
        .iter()
        .map(|r| r.body.as_str().to_owned())
        .collect()
}
