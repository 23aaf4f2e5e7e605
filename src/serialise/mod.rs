//! Conversion of contexts into collector request bodies.

mod envelope;
mod time;

use thiserror::Error;

pub use envelope::{EventBody, EventPayload, make_body, make_body_at, serialise_batch, serialise_body};
pub use time::format_time;

/// Errors raised while building or rendering a body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("no context to serialise")]
    MissingContext,
    #[error("event message must not be null")]
    NullMessage,
    #[error("failed to encode body: {0}")]
    Json(#[from] serde_json::Error),
}
