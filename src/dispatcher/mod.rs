//! Asynchronous delivery of flushed contexts to the collector.
//!
//! The [`Dispatcher`] turns a context into an [`OutboundRequest`] on the
//! calling thread and hands it to a dedicated worker thread over a bounded
//! channel. The worker calls the [`HttpTransport`], interprets the
//! collector's answer and reports through the caller's callback and the
//! shared [`ErrorHandler`].

mod backoff;
mod request;
mod transport;
mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use thiserror::Error;

pub use request::{HecResponse, OutboundRequest, RequestBody, TransportResponse};
pub use transport::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, HttpTransport, TransportError, UreqTransport,
};

use crate::config::ConfigError;
use crate::context::Context;
use crate::error_handler::{ErrorHandler, HandlerSlot};
use crate::middleware::BoxError;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::serialise::BodyError;
use worker::{Command, Job};

/// Default depth of the worker queue.
pub const DEFAULT_CAPACITY: usize = 1024;
/// How long `close` waits for the worker to drain.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result delivered to a send or flush callback.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The event was queued for a later manual flush.
    Queued,
    /// The collector answered; the response may still carry a rejection code.
    Delivered(HecResponse),
}

/// Completion callback for `send_with` and `flush_with`.
///
/// Runs on the dispatch worker for delivered requests and on the calling
/// thread for failures detected before dispatch.
pub type DeliveryCallback = Box<dyn FnOnce(Result<Outcome, DeliveryError>) + Send + 'static>;

/// Asynchronous delivery failure.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A middleware step failed; the flush was abandoned.
    #[error("middleware {step:?} failed: {source}")]
    Chain { step: String, source: BoxError },
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The collector answered with a non-zero `code`.
    #[error("collector rejected the request (code {code}): {text}")]
    RemoteRejection { code: String, text: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error("dispatch queue is full; event dropped")]
    QueueFull,
    #[error("dispatcher is closed; event dropped")]
    Closed,
}

impl DeliveryError {
    /// The collector's rejection code, for [`DeliveryError::RemoteRejection`].
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::RemoteRejection { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Owns the worker thread and the request pipeline in front of it.
pub struct Dispatcher {
    tx: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
    handler: HandlerSlot,
    warner: RateLimitedWarner,
    closed: AtomicBool,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, handler: Arc<dyn ErrorHandler>) -> Self {
        Self::spawn(transport, HandlerSlot::new(handler), DEFAULT_CAPACITY)
    }

    pub(crate) fn spawn(
        transport: Arc<dyn HttpTransport>,
        handler: HandlerSlot,
        capacity: usize,
    ) -> Self {
        let (tx, handle) = worker::spawn_worker(capacity.max(1), transport, handler.clone());
        Self {
            tx,
            handle: Mutex::new(Some(handle)),
            handler,
            warner: RateLimitedWarner::default(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn set_error_handler(&self, handler: Arc<dyn ErrorHandler>) {
        self.handler.replace(handler);
    }

    /// Validate, encode and enqueue `context` for delivery.
    ///
    /// Never blocks on the network. Failures found before the request
    /// reaches the worker go to the error handler and then the callback.
    pub fn send_events(&self, context: Context, callback: Option<DeliveryCallback>) {
        let context = match context.revalidated() {
            Ok(context) => context,
            Err((err, context)) => return self.fail(err.into(), &context, callback),
        };
        let request = match request::build_request(&context) {
            Ok(request) => request,
            Err(err) => return self.fail(err, &context, callback),
        };
        if self.closed.load(Ordering::Acquire) {
            return self.fail(DeliveryError::Closed, &context, callback);
        }
        let job = Job {
            request,
            context,
            callback,
        };
        if let Err((err, command)) = worker::enqueue(&self.tx, job, &self.warner) {
            match command.into_job() {
                Some(job) => {
                    let Job {
                        context, callback, ..
                    } = *job;
                    self.fail(err, &context, callback);
                }
                None => self.handler.report(&err, None),
            }
        }
    }

    fn fail(&self, err: DeliveryError, context: &Context, callback: Option<DeliveryCallback>) {
        self.handler.report(&err, Some(context));
        if let Some(callback) = callback {
            callback(Err(err));
        }
    }

    /// Block until every request enqueued before this call has been handled.
    ///
    /// Returns `false` if the worker did not catch up within `timeout`.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        if self.on_worker_thread() {
            return false;
        }
        worker::round_trip(&self.tx, timeout, Command::Flush)
    }

    /// Drain pending requests and stop the worker.
    ///
    /// Later `send_events` calls fail with [`DeliveryError::Closed`].
    pub fn close(&self, timeout: Duration) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return true;
        }
        if self.on_worker_thread() {
            // The worker cannot wait for itself; it stops once the channel disconnects.
            return false;
        }
        let drained = worker::round_trip(&self.tx, timeout, Command::Shutdown);
        self.warner.flush(|count| {
            log::warn!("hec_logging dropped {count} events before close");
        });
        let handle = self.handle.lock().take();
        if drained && let Some(handle) = handle {
            let _ = handle.join();
        }
        drained
    }

    fn on_worker_thread(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| h.thread().id() == thread::current().id())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close(DEFAULT_CLOSE_TIMEOUT);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
