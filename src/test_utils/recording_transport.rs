//! An in-memory [`HttpTransport`] that records every request.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::dispatcher::{HttpTransport, OutboundRequest, TransportError, TransportResponse};

/// Body the collector sends for an accepted request.
pub fn success_body() -> String {
    r#"{"text":"Success","code":0}"#.to_owned()
}

/// Releases requests held by a gated [`RecordingTransport`].
#[derive(Clone)]
pub struct Gate {
    tx: Sender<()>,
}

impl Gate {
    /// Let `count` held requests complete.
    pub fn release(&self, count: usize) {
        for _ in 0..count {
            let _ = self.tx.send(());
        }
    }
}

/// Transport double that records requests and replays scripted answers.
///
/// Scripted responses are consumed in order; once exhausted every request
/// receives the default response.
pub struct RecordingTransport {
    requests: Mutex<Vec<OutboundRequest>>,
    arrived: Condvar,
    scripted: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    default_response: TransportResponse,
    gate: Option<Receiver<()>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
            scripted: Mutex::new(VecDeque::new()),
            default_response: TransportResponse {
                status: 200,
                body: success_body(),
            },
            gate: None,
        }
    }

    /// Answer unscripted requests with `status` and `body`.
    pub fn with_response(mut self, status: u16, body: impl Into<String>) -> Self {
        self.default_response = TransportResponse {
            status,
            body: body.into(),
        };
        self
    }

    /// Hold every request after recording it until the returned gate releases it.
    pub fn gated(mut self) -> (Self, Gate) {
        let (tx, rx) = unbounded();
        self.gate = Some(rx);
        (self, Gate { tx })
    }

    pub fn push_response(&self, response: Result<TransportResponse, TransportError>) {
        self.scripted.lock().push_back(response);
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Wait until at least `count` requests were recorded.
    pub fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut requests = self.requests.lock();
        while requests.len() < count {
            if self.arrived.wait_until(&mut requests, deadline).timed_out() {
                return requests.len() >= count;
            }
        }
        true
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for RecordingTransport {
    fn post(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            self.arrived.notify_all();
        }
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        self.scripted
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }
}
