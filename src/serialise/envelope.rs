//! The JSON envelope posted to the collector.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::BodyError;
use super::time::format_time;
use crate::context::Context;
use crate::message::Message;

/// The `event` member of an envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventPayload {
    pub message: Message,
    pub severity: String,
}

/// Wire representation of one event.
///
/// Absent metadata fields are omitted rather than sent as `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventBody {
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    pub event: EventPayload,
}

/// Build the envelope for `context`, stamping unset times with the current clock.
///
/// # Errors
///
/// [`BodyError::MissingContext`] when `context` is `None`.
pub fn make_body(context: Option<&Context>) -> Result<EventBody, BodyError> {
    make_body_at(context, Utc::now())
}

/// Build the envelope for `context` against a fixed clock.
///
/// # Errors
///
/// [`BodyError::MissingContext`] when `context` is `None`.
pub fn make_body_at(context: Option<&Context>, now: DateTime<Utc>) -> Result<EventBody, BodyError> {
    let context = context.ok_or(BodyError::MissingContext)?;
    let metadata = &context.metadata;
    Ok(EventBody {
        time: format_time(metadata.time, now),
        host: metadata.host.clone(),
        source: metadata.source.clone(),
        sourcetype: metadata.sourcetype.clone(),
        index: metadata.index.clone(),
        event: EventPayload {
            message: context.message.clone(),
            severity: context.severity().to_owned(),
        },
    })
}

/// Render an envelope as compact JSON.
pub fn serialise_body(body: &EventBody) -> Result<String, BodyError> {
    Ok(serde_json::to_string(body)?)
}

/// Serialise every context independently and concatenate the results.
///
/// The collector accepts back-to-back envelopes, so no separator is written.
pub fn serialise_batch(contexts: &[Context], now: DateTime<Utc>) -> Result<String, BodyError> {
    let mut payload = String::new();
    for context in contexts {
        let body = make_body_at(Some(context), now)?;
        payload.push_str(&serialise_body(&body)?);
    }
    Ok(payload)
}
