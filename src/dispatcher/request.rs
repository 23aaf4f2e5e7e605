//! Translation of a flushed context into an outbound HTTP request.

use std::collections::BTreeMap;

use serde_json::Value;

use super::DeliveryError;
use crate::context::{AUTHORIZATION, CONTENT_TYPE, Context};
use crate::serialise::{make_body, serialise_body};

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";
pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Header name used for form bodies, matching what collectors historically received.
const FORM_CONTENT_TYPE_HEADER: &str = "content-type";

/// Encoded request payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    /// A single JSON envelope.
    Json(String),
    /// A raw message string, usually a batch of concatenated envelopes.
    Form(String),
}

impl RequestBody {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Json(body) | Self::Form(body) => body,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => JSON_CONTENT_TYPE,
            Self::Form(_) => FORM_CONTENT_TYPE,
        }
    }
}

/// Everything the transport needs to perform one POST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundRequest {
    pub url: String,
    pub json: bool,
    pub strict_ssl: bool,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
    /// Transport-level retry budget for connection failures.
    pub max_retries: u32,
}

impl OutboundRequest {
    /// Look up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw answer from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Collector response handed to callbacks.
#[derive(Clone, Debug, PartialEq)]
pub struct HecResponse {
    pub status: u16,
    /// Unparsed response body.
    pub body: String,
    /// The body decoded as JSON, when it is JSON.
    pub parsed: Option<Value>,
}

impl HecResponse {
    /// The collector's `code` member rendered as a string.
    pub fn code(&self) -> Option<String> {
        match self.parsed.as_ref()?.get("code")? {
            Value::Null => None,
            Value::String(code) => Some(code.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.parsed.as_ref()?.get("text")?.as_str()
    }

    /// The rejection code, when the collector answered with anything but `0`.
    ///
    /// A body without a `code` member counts as accepted.
    pub fn rejection_code(&self) -> Option<String> {
        self.code().filter(|code| code != "0")
    }
}

impl From<TransportResponse> for HecResponse {
    fn from(response: TransportResponse) -> Self {
        let parsed = serde_json::from_str(&response.body).ok();
        Self {
            status: response.status,
            body: response.body,
            parsed,
        }
    }
}

/// Build the request for `context`.
///
/// The body encoding follows the context's `auto_flush` setting: JSON
/// envelopes for immediate delivery, the raw message for batches.
pub(crate) fn build_request(context: &Context) -> Result<OutboundRequest, DeliveryError> {
    let mut options = context.request_options.clone();
    options.set_header(AUTHORIZATION, context.config.authorization());
    let body = if context.config.auto_flush {
        let body = serialise_body(&make_body(Some(context))?)?;
        options.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        RequestBody::Json(body)
    } else {
        options.set_header(FORM_CONTENT_TYPE_HEADER, FORM_CONTENT_TYPE);
        RequestBody::Form(context.message.to_raw_string()?)
    };
    Ok(OutboundRequest {
        url: options.url,
        json: context.config.auto_flush,
        strict_ssl: options.strict_ssl,
        headers: options.headers,
        body,
        max_retries: context.config.max_retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, ConfigOverrides};
    use crate::context::LogEvent;
    use rstest::rstest;
    use serde_json::json;

    fn context(auto_flush: bool) -> Context {
        let overrides = ConfigOverrides::new()
            .with_token("tok")
            .with_auto_flush(auto_flush);
        let config = config::resolve(None, &overrides).expect("resolve");
        Context::initialize(LogEvent::new("hello"), &config).expect("initialize")
    }

    #[rstest]
    fn auto_flush_contexts_send_json() {
        let request = build_request(&context(true)).expect("request");
        assert!(request.json);
        assert_eq!(request.header("content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(request.header("authorization"), Some("Splunk tok"));
        let value: Value = serde_json::from_str(request.body.as_str()).expect("json body");
        assert_eq!(value["event"]["message"], json!("hello"));
    }

    #[rstest]
    fn manual_contexts_send_the_raw_message() {
        let request = build_request(&context(false)).expect("request");
        assert!(!request.json);
        assert_eq!(request.body, RequestBody::Form("hello".into()));
        assert_eq!(request.header("Content-Type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(request.headers.len(), 2);
    }

    #[rstest]
    fn token_edits_reach_the_authorization_header() {
        let mut ctx = context(true);
        ctx.config.token = "rotated".into();
        let request = build_request(&ctx).expect("request");
        assert_eq!(request.header("Authorization"), Some("Splunk rotated"));
    }

    #[rstest]
    #[case(r#"{"text":"Success","code":0}"#, Some("0"), None)]
    #[case(r#"{"text":"Invalid token","code":4}"#, Some("4"), Some("4"))]
    #[case(r#"{"text":"No data","code":"5"}"#, Some("5"), Some("5"))]
    #[case(r#"{"text":"ok"}"#, None, None)]
    #[case("not json", None, None)]
    fn response_codes_are_read(
        #[case] body: &str,
        #[case] code: Option<&str>,
        #[case] rejection: Option<&str>,
    ) {
        let response = HecResponse::from(TransportResponse {
            status: 200,
            body: body.into(),
        });
        assert_eq!(response.code().as_deref(), code);
        assert_eq!(response.rejection_code().as_deref(), rejection);
    }
}
