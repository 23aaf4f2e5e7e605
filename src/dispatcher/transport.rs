//! The HTTP collaborator and its default ureq implementation.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use ureq::{Agent, AgentBuilder, ErrorKind};

use super::backoff::RetryBackoff;
use super::request::{OutboundRequest, TransportResponse};

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BASE: Duration = Duration::from_millis(100);
const RETRY_CAP: Duration = Duration::from_secs(5);

/// Failure to obtain any HTTP response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout(_) | Self::Io(_))
    }

    fn from_ureq(url: &str, err: &ureq::Transport) -> Self {
        let reason = err.to_string();
        match err.kind() {
            ErrorKind::Dns | ErrorKind::ConnectionFailed | ErrorKind::ProxyConnect => Self::Connect {
                url: url.to_owned(),
                reason,
            },
            ErrorKind::InvalidUrl
            | ErrorKind::UnknownScheme
            | ErrorKind::BadHeader
            | ErrorKind::InsecureRequestHttpsOnly
            | ErrorKind::InvalidProxyUrl => Self::InvalidRequest(reason),
            ErrorKind::Io => {
                let timed_out = std::error::Error::source(err)
                    .and_then(|source| source.downcast_ref::<io::Error>())
                    .is_some_and(|e| {
                        matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
                    });
                if timed_out {
                    Self::Timeout(reason)
                } else {
                    Self::Io(reason)
                }
            }
            _ => Self::Other(reason),
        }
    }
}

/// Posts one request and returns the collector's answer.
///
/// HTTP error statuses are responses, not errors: only failures to get any
/// response at all are reported as [`TransportError`].
pub trait HttpTransport: Send + Sync {
    fn post(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn post(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        (**self).post(request)
    }
}

/// Blocking transport backed by a pair of pooled `ureq` agents.
///
/// Requests with `strict_ssl` set go through an agent that verifies the
/// collector certificate; the others accept self-signed certificates, which
/// is how collectors usually ship.
pub struct UreqTransport {
    strict: Agent,
    lax: Agent,
}

impl UreqTransport {
    /// # Errors
    ///
    /// [`TransportError::Tls`] when the platform TLS backend cannot be initialised.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// # Errors
    ///
    /// [`TransportError::Tls`] when the platform TLS backend cannot be initialised.
    pub fn with_timeouts(connect: Duration, request: Duration) -> Result<Self, TransportError> {
        let verifying = native_tls::TlsConnector::new().map_err(|e| TransportError::Tls(e.to_string()))?;
        let permissive = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        let agent = |connector: native_tls::TlsConnector| {
            AgentBuilder::new()
                .timeout_connect(connect)
                .timeout(request)
                .tls_connector(Arc::new(connector))
                .build()
        };
        Ok(Self {
            strict: agent(verifying),
            lax: agent(permissive),
        })
    }

    fn post_once(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let agent = if request.strict_ssl { &self.strict } else { &self.lax };
        let mut req = agent.post(&request.url);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        let response = match req.send_string(request.body.as_str()) {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(TransportError::from_ureq(&request.url, &err));
            }
        };
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

impl HttpTransport for UreqTransport {
    fn post(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let mut backoff = RetryBackoff::new(RETRY_BASE, RETRY_CAP);
        let mut attempt = 0;
        loop {
            match self.post_once(request) {
                Err(err) if err.is_retryable() && attempt < request.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_sleep();
                    log::debug!(
                        "collector request failed ({err}); retry {attempt}/{} in {delay:?}",
                        request.max_retries
                    );
                    thread::sleep(delay);
                }
                result => return result,
            }
        }
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}
