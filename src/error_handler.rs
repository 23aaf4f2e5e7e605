//! Receivers for asynchronous delivery failures.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::Context;
use crate::dispatcher::DeliveryError;

/// Observer notified of middleware, transport and collector failures.
///
/// Handlers run on whichever thread discovered the failure: the flushing
/// thread for middleware errors, the dispatch worker otherwise.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: &DeliveryError, context: Option<&Context>);
}

impl<F> ErrorHandler for F
where
    F: Fn(&DeliveryError, Option<&Context>) + Send + Sync,
{
    fn handle(&self, error: &DeliveryError, context: Option<&Context>) {
        self(error, context)
    }
}

/// Default handler: reports through the `log` facade and carries on.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, error: &DeliveryError, context: Option<&Context>) {
        match context {
            Some(ctx) => log::error!(
                "hec_logging delivery to {} failed: {error}",
                ctx.request_options.url
            ),
            None => log::error!("hec_logging delivery failed: {error}"),
        }
    }
}

/// Replaceable handler shared between a logger and its dispatcher.
#[derive(Clone)]
pub(crate) struct HandlerSlot(Arc<RwLock<Arc<dyn ErrorHandler>>>);

impl HandlerSlot {
    pub(crate) fn new(handler: Arc<dyn ErrorHandler>) -> Self {
        Self(Arc::new(RwLock::new(handler)))
    }

    pub(crate) fn replace(&self, handler: Arc<dyn ErrorHandler>) {
        *self.0.write() = handler;
    }

    /// Invoke the current handler without holding the lock during the call.
    pub(crate) fn report(&self, error: &DeliveryError, context: Option<&Context>) {
        let handler = Arc::clone(&self.0.read());
        handler.handle(error, context);
    }
}

impl Default for HandlerSlot {
    fn default() -> Self {
        Self::new(Arc::new(LogErrorHandler))
    }
}
