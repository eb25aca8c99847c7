//! Counters published through the `metrics` facade.
//!
//! No recorder is installed here; embedders choose an exporter.

use ::metrics::counter;

pub fn record_verification(passed: bool) {
    let outcome = if passed { "passed" } else { "failed" };
    counter!("local_models_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_activation() {
    counter!("local_models_activations_total").increment(1);
}

pub fn record_deletion() {
    counter!("local_models_deletions_total").increment(1);
}

pub fn record_versions_retired(count: usize) {
    counter!("local_models_versions_retired_total").increment(count as u64);
}
