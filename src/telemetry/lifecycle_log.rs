//! Structured logging for bundle lifecycle events.
//!
//! Verification outcomes, activations and deletions are logged with a fixed
//! event name and severity so they can be filtered for forensic analysis.

/// Lifecycle event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Candidate bundle passed verification.
    VerificationPassed,
    /// Candidate bundle rejected (missing file, bad manifest, size mismatch).
    VerificationFailed,
    /// A declared file's SHA-256 digest did not match.
    DigestMismatch,
    /// A manifest entry tried to escape the install directory.
    PathTraversalAttempt,
    /// A verified bundle became the active version.
    Activated,
    /// A superseded version directory was removed.
    VersionRetired,
    /// All on-disk state for the component was removed.
    ComponentDeleted,
    /// Component registered with the update service.
    Registered,
}

impl LifecycleEvent {
    pub fn severity(&self) -> LifecycleSeverity {
        match self {
            Self::VerificationPassed => LifecycleSeverity::Debug,
            Self::VerificationFailed => LifecycleSeverity::Warning,
            Self::DigestMismatch => LifecycleSeverity::Critical,
            Self::PathTraversalAttempt => LifecycleSeverity::Critical,
            Self::Activated => LifecycleSeverity::Info,
            Self::VersionRetired => LifecycleSeverity::Info,
            Self::ComponentDeleted => LifecycleSeverity::Info,
            Self::Registered => LifecycleSeverity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationPassed => "verification_passed",
            Self::VerificationFailed => "verification_failed",
            Self::DigestMismatch => "digest_mismatch",
            Self::PathTraversalAttempt => "path_traversal_attempt",
            Self::Activated => "activated",
            Self::VersionRetired => "version_retired",
            Self::ComponentDeleted => "component_deleted",
            Self::Registered => "registered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleSeverity {
    Debug,
    Info,
    Warning,
    Critical,
}

impl LifecycleSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Log a lifecycle event with structured details.
///
/// # Example
/// ```
/// use local_models_updater::telemetry::{log_lifecycle_event, LifecycleEvent};
///
/// log_lifecycle_event(
///     LifecycleEvent::VerificationFailed,
///     "required model file missing",
///     &[("file", "qa_model.bin")],
/// );
/// ```
pub fn log_lifecycle_event(event: LifecycleEvent, message: &str, details: &[(&str, &str)]) {
    let details_str = details
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ");

    let event_type = event.as_str();
    let severity = event.severity().as_str();

    match event.severity() {
        LifecycleSeverity::Debug => {
            tracing::debug!(event = event_type, severity, details = %details_str, "{}", message)
        }
        LifecycleSeverity::Info => {
            tracing::info!(event = event_type, severity, details = %details_str, "{}", message)
        }
        LifecycleSeverity::Warning => {
            tracing::warn!(event = event_type, severity, details = %details_str, "{}", message)
        }
        LifecycleSeverity::Critical => {
            tracing::error!(event = event_type, severity, details = %details_str, "{}", message)
        }
    }
}

/// Convenience macro for logging lifecycle events.
#[macro_export]
macro_rules! lifecycle_log {
    ($event:expr, $message:expr) => {
        $crate::telemetry::log_lifecycle_event($event, $message, &[])
    };
    ($event:expr, $message:expr, $($key:expr => $value:expr),+) => {
        $crate::telemetry::log_lifecycle_event(
            $event,
            $message,
            &[$(($key, $value)),+]
        )
    };
}
