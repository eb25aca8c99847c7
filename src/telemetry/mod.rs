//! Telemetry: structured logging, lifecycle events and metrics counters.
//!
//! All output is file- or stderr-based; nothing is exported over the network.

mod lifecycle_log;
mod logging;
mod metrics;
mod spans;

pub use lifecycle_log::{log_lifecycle_event, LifecycleEvent, LifecycleSeverity};
pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    record_activation, record_deletion, record_verification, record_versions_retired,
};
pub use spans::{InstallSpan, SpanExt};
