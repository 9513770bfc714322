#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pagesdns::zone::{is_within_zone, longest_suffix_match};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    hostname: &'a str,
    zones: Vec<&'a str>,
}

fuzz_target!(|input: Input<'_>| {
    if let Some(found) = longest_suffix_match(input.hostname, input.zones.iter().copied()) {
        // The match owns the hostname and no longer owner exists.
        assert!(is_within_zone(input.hostname, found));
        assert!(input
            .zones
            .iter()
            .filter(|zone| is_within_zone(input.hostname, zone))
            .all(|zone| zone.len() <= found.len()));
    } else {
        assert!(!input
            .zones
            .iter()
            .any(|zone| is_within_zone(input.hostname, zone)));
    }
});
