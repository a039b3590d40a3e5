use std::sync::Arc;

use serde_json::Value;

use crate::error::DispatchError;
use crate::message::Request;

/// A step in the call chain: the terminal handler invocation, or an
/// interceptor wrapped around the rest of the chain.
pub type Continuation<'a> = dyn Fn(&Request<'_>) -> Result<Value, DispatchError> + 'a;

/// A cross-cutting interceptor.
///
/// Instances are shared by every concurrent dispatch (and by deferred
/// envelopes), so they must not keep per-call mutable state.
pub trait Middleware: Send + Sync {
    fn handle(&self, request: &Request<'_>, next: Next<'_>) -> Result<Value, DispatchError>;

    /// Name recorded in job records.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The rest of the chain, handed to a middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    inner: &'a Continuation<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(inner: &'a Continuation<'a>) -> Self {
        Self { inner }
    }

    /// Invoke the remaining middleware and the terminal handler.
    pub fn run(self, request: &Request<'_>) -> Result<Value, DispatchError> {
        (self.inner)(request)
    }
}

/// Ordered interceptors, executed in registration order (FIFO).
///
/// Cloning is cheap and shares the interceptor instances.
#[derive(Clone, Default)]
pub struct MiddlewarePipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor. Returns `self` for chaining.
    pub fn pipe<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.pipe_arc(Arc::new(middleware))
    }

    /// Append an interceptor that is already shared elsewhere.
    pub fn pipe_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    pub fn names(&self) -> Vec<String> {
        self.middleware.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run `request` through every interceptor and then `terminal`.
    ///
    /// The chain is folded from the last interceptor to the first, so
    /// interceptor `i` closes over the continuation built for `i + 1` and the
    /// terminal invocation sits innermost.
    pub fn process(
        &self,
        request: &Request<'_>,
        terminal: &Continuation<'_>,
    ) -> Result<Value, DispatchError> {
        let mut chain: Box<Continuation<'_>> =
            Box::new(move |request: &Request<'_>| terminal(request));
        for middleware in self.middleware.iter().rev() {
            chain = link(&**middleware, chain);
        }
        chain(request)
    }
}

fn link<'a>(middleware: &'a dyn Middleware, next: Box<Continuation<'a>>) -> Box<Continuation<'a>> {
    Box::new(move |request: &Request<'_>| middleware.handle(request, Next::new(&*next)))
}

impl std::fmt::Debug for MiddlewarePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
