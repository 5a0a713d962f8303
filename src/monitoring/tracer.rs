/*!
 * Tracing
 * Structured tracing for pipe operations using the tracing crate
 */

use crate::core::limits::ENV_TRACE_JSON;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SYNCPIPE_TRACE_JSON: Enable JSON output (default: false)
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    if try_init_tracing().is_err() {
        debug!("tracing subscriber already installed");
    }
}

/// Same as `init_tracing`, reporting whether a subscriber was installed
pub fn try_init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
        info!("Structured tracing initialized with JSON output");
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
        info!("Structured tracing initialized with compact output");
    }
    Ok(())
}

/// Span that reports its own duration when dropped
pub struct OperationSpan {
    span: tracing::Span,
    operation: &'static str,
    start: Instant,
}

impl OperationSpan {
    pub fn new(operation: &'static str) -> Self {
        let span = span!(Level::DEBUG, "operation", operation, bytes = tracing::field::Empty);
        Self {
            span,
            operation,
            start: Instant::now(),
        }
    }

    /// Record how many bytes the operation moved
    pub fn record_bytes(&self, bytes: u64) {
        self.span.record("bytes", bytes);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration.as_secs() >= 1 {
            warn!(
                operation = self.operation,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow operation"
            );
        } else {
            debug!(
                operation = self.operation,
                duration_us = duration.as_micros() as u64,
                "operation completed"
            );
        }
    }
}

/// Start a timed span for `operation`
pub fn span_operation(operation: &'static str) -> OperationSpan {
    OperationSpan::new(operation)
}
