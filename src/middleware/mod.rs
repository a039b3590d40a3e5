//! Interceptors composed around every dispatch.
//!
//! ## Architecture
//!
//! ```text
//! pipe(A).pipe(B).pipe(C)
//!
//!   A ──► B ──► C ──► terminal (handler, maybe inside a transaction)
//!   A ◄── B ◄── C ◄──┘
//! ```
//!
//! The first interceptor added is the outermost. Each one receives the request
//! and a [`Next`] continuation; it may work before or after calling it,
//! rewrite the result, translate the error, or skip it entirely.
//!
//! ## Example
//!
//! ```ignore
//! use routed_rust::{DispatchError, Middleware, MiddlewarePipeline, Next, Request};
//! use serde_json::Value;
//!
//! struct ReadOnlyMode;
//!
//! impl Middleware for ReadOnlyMode {
//!     fn handle(&self, request: &Request<'_>, next: Next<'_>) -> Result<Value, DispatchError> {
//!         if request.is_command() {
//!             return Err(HandlerError::Rejected("maintenance window".into()).into());
//!         }
//!         next.run(request)
//!     }
//! }
//!
//! let pipeline = MiddlewarePipeline::new()
//!     .pipe(LoggingMiddleware::new())
//!     .pipe(ReadOnlyMode);
//! ```

mod logging;
mod pipeline;

pub use logging::LoggingMiddleware;
pub use pipeline::{Continuation, Middleware, MiddlewarePipeline, Next};
