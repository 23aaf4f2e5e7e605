//! The queueing logger.
//!
//! [`HecLogger`] resolves each sent event into a [`Context`], queues it and
//! decides when to flush. In auto-flush mode every `send` flushes the most
//! recently queued context on its own. In manual mode contexts accumulate
//! until the caller flushes, a batching threshold is crossed or the batch
//! interval elapses; the whole queue is then sent as one request.

mod batching;
mod convenience_methods;
mod queue;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use thiserror::Error;

use crate::config::{self, Config, ConfigError, ConfigOverrides};
use crate::context::{Context, LogEvent, Metadata};
use crate::dispatcher::{
    DEFAULT_CAPACITY, DEFAULT_CLOSE_TIMEOUT, DeliveryCallback, DeliveryError, Dispatcher,
    HttpTransport, Outcome, TransportError, UreqTransport,
};
use crate::error_handler::{ErrorHandler, HandlerSlot};
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareError};
use crate::serialise::{make_body, serialise_batch, serialise_body};

use batching::BatchTimer;
use queue::ContextQueue;

/// Errors raised while building a logger.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Configures and constructs a [`HecLogger`].
pub struct HecLoggerBuilder {
    overrides: ConfigOverrides,
    transport: Option<Arc<dyn HttpTransport>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    capacity: usize,
    metadata: Metadata,
}

impl HecLoggerBuilder {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            transport: None,
            error_handler: None,
            capacity: DEFAULT_CAPACITY,
            metadata: Metadata::default(),
        }
    }

    /// Replace the default [`UreqTransport`].
    pub fn with_transport(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the default [`LogErrorHandler`](crate::LogErrorHandler).
    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Depth of the dispatch queue in front of the worker thread.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Metadata merged into every event that does not set the field itself.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// # Errors
    ///
    /// [`BuildError::Config`] when the configuration does not resolve and
    /// [`BuildError::Transport`] when the default transport cannot start.
    pub fn build(self) -> Result<HecLogger, BuildError> {
        let config = config::resolve(None, &self.overrides)?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::new()?),
        };
        let handler = match self.error_handler {
            Some(handler) => HandlerSlot::new(handler),
            None => HandlerSlot::default(),
        };
        let dispatcher = Dispatcher::spawn(transport, handler.clone(), self.capacity);
        log::debug!(
            "hec_logging logger for {} ready (auto_flush={})",
            config.url(),
            config.auto_flush
        );
        let inner = Arc::new(LoggerInner {
            queue: Mutex::new(ContextQueue::default()),
            middleware: RwLock::new(MiddlewareChain::new()),
            default_metadata: RwLock::new(self.metadata),
            handler,
            dispatcher,
            closed: AtomicBool::new(false),
            config,
        });
        let timer = match (inner.config.auto_flush, inner.config.batch_interval) {
            (false, Some(interval)) => Some(BatchTimer::spawn(interval, Arc::downgrade(&inner))),
            _ => None,
        };
        Ok(HecLogger {
            inner,
            timer: Mutex::new(timer),
        })
    }
}

pub(crate) struct LoggerInner {
    config: Config,
    queue: Mutex<ContextQueue>,
    middleware: RwLock<MiddlewareChain>,
    default_metadata: RwLock<Metadata>,
    handler: HandlerSlot,
    dispatcher: Dispatcher,
    closed: AtomicBool,
}

impl LoggerInner {
    fn send(&self, event: LogEvent, callback: Option<DeliveryCallback>) -> Result<(), ConfigError> {
        let mut event = event;
        event.metadata = event.metadata.merged_over(&self.default_metadata.read());
        let context = Context::initialize(event, &self.config)?;
        let bytes = self.measure(&context);
        {
            let mut queue = self.queue.lock();
            if self.closed.load(Ordering::Acquire) {
                drop(queue);
                self.fail(DeliveryError::Closed, Some(&context), callback);
                return Ok(());
            }
            queue.push(context, bytes);
        }

        if self.config.auto_flush {
            self.flush(callback);
            return Ok(());
        }
        if let Some(callback) = callback {
            callback(Ok(Outcome::Queued));
        }
        self.flush_if_over_threshold();
        Ok(())
    }

    /// Serialised size used for the byte threshold; zero when no size limit is set.
    fn measure(&self, context: &Context) -> usize {
        if self.config.auto_flush || self.config.max_batch_size.is_none() {
            return 0;
        }
        make_body(Some(context))
            .and_then(|body| serialise_body(&body))
            .map_or(0, |body| body.len())
    }

    fn flush_if_over_threshold(&self) {
        let drained = {
            let mut queue = self.queue.lock();
            let (len, bytes) = (queue.len(), queue.bytes());
            let count_reached = self.config.max_batch_count.is_some_and(|max| len >= max);
            let size_reached = self.config.max_batch_size.is_some_and(|max| bytes >= max);
            if !(count_reached || size_reached) {
                return;
            }
            log::debug!("hec_logging batch threshold reached ({len} events, {bytes} bytes)");
            queue.drain()
        };
        self.send_batch(drained, None);
    }

    /// Auto-flush pops the newest context; manual mode batches the whole queue.
    pub(crate) fn flush(&self, callback: Option<DeliveryCallback>) {
        if self.config.auto_flush {
            let popped = self.queue.lock().pop_last();
            let context = popped.unwrap_or_else(|| Context::placeholder(&self.config));
            return self.process(context, callback);
        }
        let drained = self.queue.lock().drain();
        self.send_batch(drained, callback);
    }

    /// Batch and send whatever is queued; does nothing when the queue is empty.
    pub(crate) fn flush_pending(&self) {
        let drained = {
            let mut queue = self.queue.lock();
            if queue.is_empty() {
                return;
            }
            queue.drain()
        };
        log::debug!("hec_logging flushing {} pending events", drained.len());
        self.send_batch(drained, None);
    }

    fn send_batch(&self, drained: Vec<Context>, callback: Option<DeliveryCallback>) {
        match serialise_batch(&drained, Utc::now()) {
            Ok(payload) => self.process(Context::batch(payload, &self.config), callback),
            Err(err) => self.fail(err.into(), None, callback),
        }
    }

    fn fail(&self, err: DeliveryError, context: Option<&Context>, callback: Option<DeliveryCallback>) {
        self.handler.report(&err, context);
        if let Some(callback) = callback {
            callback(Err(err));
        }
    }

    fn process(&self, context: Context, callback: Option<DeliveryCallback>) {
        let context = match context.revalidated() {
            Ok(context) => context,
            Err((err, context)) => return self.fail(err.into(), Some(&context), callback),
        };
        let chain = self.middleware.read().clone();
        match chain.run(context) {
            Ok(context) => self.dispatcher.send_events(context, callback),
            Err(failure) => {
                let err = DeliveryError::Chain {
                    step: failure.step,
                    source: failure.error,
                };
                self.handler.report(&err, Some(&failure.context));
            }
        }
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.config.auto_flush {
            self.flush_pending();
        }
        if !self.dispatcher.close(DEFAULT_CLOSE_TIMEOUT) {
            log::warn!("hec_logging dispatcher did not drain before close");
        }
    }
}

/// Buffered logger delivering events to an HTTP Event Collector.
///
/// # Examples
///
/// ```no_run
/// use hec_logging::{ConfigOverrides, HecLogger, LogEvent};
///
/// let logger = HecLogger::builder(ConfigOverrides::new().with_token("secret"))
///     .build()
///     .unwrap();
/// logger.send(LogEvent::new("service started")).unwrap();
/// ```
pub struct HecLogger {
    inner: Arc<LoggerInner>,
    timer: Mutex<Option<BatchTimer>>,
}

impl HecLogger {
    pub fn builder(overrides: ConfigOverrides) -> HecLoggerBuilder {
        HecLoggerBuilder::new(overrides)
    }

    /// Build a logger with the default transport and error handler.
    pub fn new(overrides: ConfigOverrides) -> Result<Self, BuildError> {
        Self::builder(overrides).build()
    }

    /// Build a logger from an untyped JSON configuration.
    pub fn from_json(value: &Value) -> Result<Self, BuildError> {
        let overrides = ConfigOverrides::from_json(value)?;
        Self::new(overrides)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Queue `event` and, in auto-flush mode, dispatch it immediately.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when the event's configuration overrides do not resolve.
    pub fn send(&self, event: LogEvent) -> Result<(), ConfigError> {
        self.inner.send(event, None)
    }

    /// Like [`send`](Self::send), reporting the result to `callback`.
    ///
    /// In manual mode the callback receives [`Outcome::Queued`] right away.
    pub fn send_with<F>(&self, event: LogEvent, callback: F) -> Result<(), ConfigError>
    where
        F: FnOnce(Result<Outcome, DeliveryError>) + Send + 'static,
    {
        self.inner.send(event, Some(Box::new(callback)))
    }

    pub fn flush(&self) {
        self.inner.flush(None);
    }

    pub fn flush_with<F>(&self, callback: F)
    where
        F: FnOnce(Result<Outcome, DeliveryError>) + Send + 'static,
    {
        self.inner.flush(Some(Box::new(callback)));
    }

    /// Append a step to the middleware chain.
    pub fn use_middleware<M: Middleware + 'static>(&self, step: M) -> Result<(), MiddlewareError> {
        self.inner.middleware.write().register(step)
    }

    pub fn use_named<M: Middleware + 'static>(
        &self,
        name: impl Into<String>,
        step: M,
    ) -> Result<(), MiddlewareError> {
        self.inner.middleware.write().register_named(name, step)
    }

    pub fn set_error_handler(&self, handler: impl ErrorHandler + 'static) {
        self.inner.handler.replace(Arc::new(handler));
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue_len()
    }

    /// Block until every request dispatched before this call has completed.
    pub fn wait_for_dispatch(&self, timeout: Duration) -> bool {
        self.inner.dispatcher.wait_idle(timeout)
    }

    /// Stop the batch timer, flush a non-empty manual queue and drain the worker.
    pub fn close(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.stop();
        }
        self.inner.close();
    }
}

impl Drop for HecLogger {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for HecLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HecLogger")
            .field("url", &self.inner.config.url())
            .field("auto_flush", &self.inner.config.auto_flush)
            .field("queued", &self.queue_len())
            .finish_non_exhaustive()
    }
}
