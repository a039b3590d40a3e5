use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value;

use super::pipeline::{Middleware, Next};
use crate::config::LoggingConfig;
use crate::error::DispatchError;
use crate::message::Request;

/// Records start, success and failure of every dispatch through `tracing`.
///
/// Start is logged at `debug`, success at `info`, failure at `error`. With a
/// buffer attached, one line per event is also appended to it, which is
/// handy for asserting on log output in tests.
pub struct LoggingMiddleware {
    log_payloads: bool,
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        LoggingMiddleware {
            log_payloads: false,
            buffer: None,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new().with_payloads(config.log_payloads)
    }

    /// Include the JSON-encoded request body in the start event.
    pub fn with_payloads(mut self, log_payloads: bool) -> Self {
        self.log_payloads = log_payloads;
        self
    }

    pub fn with_buffer(mut self, buffer: Arc<Mutex<Vec<String>>>) -> Self {
        self.buffer = Some(buffer);
        self
    }

    fn record(&self, line: String) {
        if let Some(buffer) = &self.buffer {
            // A poisoned buffer only loses the line.
            if let Ok(mut buffer) = buffer.lock() {
                buffer.push(line);
            }
        }
    }

    fn log_start(&self, request: &Request<'_>) {
        let kind = request.kind();
        let name = request.name();

        if self.log_payloads {
            match request.to_json() {
                Ok(payload) => {
                    tracing::debug!(%kind, name, %payload, "dispatch started");
                    self.record(format!("start {} {} {}", kind, name, payload));
                    return;
                }
                Err(e) => {
                    tracing::warn!(%kind, name, error = %e, "request payload not serializable");
                }
            }
        }

        tracing::debug!(%kind, name, "dispatch started");
        self.record(format!("start {} {}", kind, name));
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&self, request: &Request<'_>, next: Next<'_>) -> Result<Value, DispatchError> {
        self.log_start(request);
        let started = Instant::now();

        let result = next.run(request);

        let kind = request.kind();
        let name = request.name();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                tracing::info!(%kind, name, elapsed_ms, "dispatch succeeded");
                self.record(format!("success {} {}", kind, name));
            }
            Err(e) => {
                tracing::error!(%kind, name, elapsed_ms, error = %e, "dispatch failed");
                self.record(format!("failure {} {}: {}", kind, name, e));
            }
        }

        result
    }

    fn name(&self) -> &str {
        "logging"
    }
}
