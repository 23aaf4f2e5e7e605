//! Event payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::serialise::BodyError;

/// Payload carried by an event.
///
/// Serialises untagged, so a [`Message::Mapping`] lands on the wire as a JSON
/// object and a [`Message::Text`] as a plain string. There is deliberately
/// no null variant: every event carries a payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Bool(bool),
    Number(Number),
    Text(String),
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
}

impl Message {
    /// Render the payload for form-encoded (raw) delivery.
    ///
    /// Text is sent verbatim; every other variant is rendered as JSON.
    pub fn to_raw_string(&self) -> Result<String, BodyError> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            other => Ok(serde_json::to_string(other)?),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Message {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Message {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Message {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for Message {
    /// Non-finite floats have no JSON form and fall back to their text.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or_else(|| Self::Text(value.to_string()), Self::Number)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(value: Map<String, Value>) -> Self {
        Self::Mapping(value)
    }
}

impl From<Vec<Value>> for Message {
    fn from(value: Vec<Value>) -> Self {
        Self::Sequence(value)
    }
}

impl TryFrom<Value> for Message {
    type Error = BodyError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Err(BodyError::NullMessage),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::String(s) => Ok(Self::Text(s)),
            Value::Array(items) => Ok(Self::Sequence(items)),
            Value::Object(map) => Ok(Self::Mapping(map)),
        }
    }
}
