//! An [`ErrorHandler`] that keeps every report for later assertions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::context::Context;
use crate::dispatcher::DeliveryError;
use crate::error_handler::ErrorHandler;

/// One report received by a [`CollectingErrorHandler`].
#[derive(Clone, Debug)]
pub struct CollectedError {
    /// The error's display text.
    pub message: String,
    /// Variant name, e.g. `"Chain"` or `"RemoteRejection"`.
    pub kind: &'static str,
    pub code: Option<String>,
    pub context: Option<Context>,
}

fn kind_of(error: &DeliveryError) -> &'static str {
    match error {
        DeliveryError::Chain { .. } => "Chain",
        DeliveryError::Transport(_) => "Transport",
        DeliveryError::RemoteRejection { .. } => "RemoteRejection",
        DeliveryError::Config(_) => "Config",
        DeliveryError::Body(_) => "Body",
        DeliveryError::QueueFull => "QueueFull",
        DeliveryError::Closed => "Closed",
    }
}

#[derive(Default)]
struct Shared {
    errors: Mutex<Vec<CollectedError>>,
    arrived: Condvar,
}

/// Cloneable handler; clones share one report list.
#[derive(Clone, Default)]
pub struct CollectingErrorHandler {
    shared: Arc<Shared>,
}

impl CollectingErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every report so far.
    pub fn collected(&self) -> Vec<CollectedError> {
        self.shared.errors.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.shared.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` reports arrived.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut errors = self.shared.errors.lock();
        while errors.len() < count {
            if self.shared.arrived.wait_until(&mut errors, deadline).timed_out() {
                return errors.len() >= count;
            }
        }
        true
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn handle(&self, error: &DeliveryError, context: Option<&Context>) {
        let mut errors = self.shared.errors.lock();
        errors.push(CollectedError {
            message: error.to_string(),
            kind: kind_of(error),
            code: error.code().map(str::to_owned),
            context: context.cloned(),
        });
        self.shared.arrived.notify_all();
    }
}
