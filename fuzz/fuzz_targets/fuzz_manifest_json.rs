//! Fuzz target for bundle manifest parsing.
//!
//! Arbitrary bytes parsed as a manifest must never panic, and every declared
//! path that passes the safety check must stay relative.

#![no_main]

use libfuzzer_sys::fuzz_target;
use local_models_updater::models::{is_safe_relative_path, BundleManifest};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(manifest) = BundleManifest::from_json(text) else {
        return;
    };
    let _ = manifest.declared_version();
    for file in &manifest.files {
        if is_safe_relative_path(&file.path) {
            assert!(std::path::Path::new(&file.path).is_relative());
            assert!(!file.path.split('/').any(|part| part == ".."));
        }
    }
});
