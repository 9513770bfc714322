#![no_main]

use libfuzzer_sys::fuzz_target;
use pagesdns::config::UserConfig;

fuzz_target!(|data: &[u8]| {
    // Arbitrary stored blobs must parse or fail cleanly.
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(config) = UserConfig::from_blob(Some(&value)) {
            for name in config.zones.names() {
                let _ = config.zones.token_for(name);
            }
        }
    }
});
