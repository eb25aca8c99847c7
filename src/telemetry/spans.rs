//! Span utilities for install lifecycle tracing.

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for install lifecycle spans.
pub struct InstallSpan;

impl InstallSpan {
    /// `version` and `status` are filled in as the install progresses.
    pub fn new(component_id: &str, operation: &'static str) -> Span {
        info_span!(
            "component_install",
            component_id = %component_id,
            operation = operation,
            version = tracing::field::Empty,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}
