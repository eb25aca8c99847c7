//! Fuzz target for version string parsing.
//!
//! A parsed version must render to a string that parses back to an equal value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use local_models_updater::component::BundleVersion;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(version) = BundleVersion::parse(text) {
            let rendered = version.to_string();
            assert_eq!(BundleVersion::parse(&rendered).ok(), Some(version));
        }
    }
});
