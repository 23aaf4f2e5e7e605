//! Helpers shared by unit and integration tests.
//!
//! Compiled for the crate's own tests and, through the `test-util` feature,
//! for downstream crates that want an in-memory collector.

mod collecting_error_handler;
mod recording_transport;

pub use collecting_error_handler::{CollectedError, CollectingErrorHandler};
pub use recording_transport::{Gate, RecordingTransport, success_body};
