//! User transform steps run over a context before dispatch.
//!
//! Steps execute in registration order on the flushing thread. Each step
//! owns the context it receives and hands back the context the next step
//! should see. The first failure stops the chain.

use std::sync::Arc;

use thiserror::Error;

use crate::context::Context;

/// Boxed error type carried by middleware and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a single step.
#[derive(Debug)]
pub struct MiddlewareFailure {
    pub error: BoxError,
    /// The context the step wants reported; the chain's own copy is used when absent.
    pub context: Option<Context>,
}

impl MiddlewareFailure {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self {
            error: error.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// A transform step applied to every flushed context.
///
/// Closures of the form `Fn(Context) -> Result<Context, MiddlewareFailure>`
/// implement this trait directly.
pub trait Middleware: Send + Sync {
    /// Name reported when the step fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn process(&self, context: Context) -> Result<Context, MiddlewareFailure>;
}

impl<F> Middleware for F
where
    F: Fn(Context) -> Result<Context, MiddlewareFailure> + Send + Sync,
{
    fn process(&self, context: Context) -> Result<Context, MiddlewareFailure> {
        self(context)
    }
}

struct Named<M> {
    name: String,
    inner: M,
}

impl<M: Middleware> Middleware for Named<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, context: Context) -> Result<Context, MiddlewareFailure> {
        self.inner.process(context)
    }
}

/// Errors raised when registering a step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MiddlewareError {
    #[error("middleware name must not be blank")]
    BlankName,
}

/// A step failure surfaced by [`MiddlewareChain::run`].
#[derive(Debug, Error)]
#[error("middleware {step:?} failed: {error}")]
pub struct ChainFailure {
    #[source]
    pub error: BoxError,
    pub step: String,
    /// Best-known context at the point of failure.
    pub context: Context,
}

/// Ordered list of registered steps.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    steps: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `step` to the chain.
    ///
    /// # Errors
    ///
    /// [`MiddlewareError::BlankName`] when the step reports an empty name.
    pub fn register<M: Middleware + 'static>(&mut self, step: M) -> Result<(), MiddlewareError> {
        if step.name().trim().is_empty() {
            return Err(MiddlewareError::BlankName);
        }
        self.steps.push(Arc::new(step));
        Ok(())
    }

    /// Append `step` under an explicit name.
    pub fn register_named<M: Middleware + 'static>(
        &mut self,
        name: impl Into<String>,
        step: M,
    ) -> Result<(), MiddlewareError> {
        self.register(Named {
            name: name.into(),
            inner: step,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Feed `initial` through every step in order.
    ///
    /// # Errors
    ///
    /// Returns the first step failure. Later steps do not run.
    pub fn run(&self, initial: Context) -> Result<Context, ChainFailure> {
        let mut current = initial;
        for step in &self.steps {
            let fallback = current.clone();
            match step.process(current) {
                Ok(next) => current = next,
                Err(failure) => {
                    log::debug!("middleware {:?} failed: {}", step.name(), failure.error);
                    return Err(ChainFailure {
                        error: failure.error,
                        step: step.name().to_owned(),
                        context: failure.context.unwrap_or(fallback),
                    });
                }
            }
        }
        Ok(current)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| s.name()))
            .finish()
    }
}
