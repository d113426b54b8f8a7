//! Fuzz target: `Fixed::from_str` and `Display`
//!
//! Any string either fails to parse with a typed error or yields a value
//! whose four-decimal rendering parses back to the same value.
//!
//! cargo fuzz run fuzz_fixed_parse

#![no_main]

use growbox::fixed::Fixed;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(value) = text.parse::<Fixed>() {
        let rendered = format!("{:.4}", value);
        let back: Fixed = rendered.parse().expect("rendered value must parse");
        assert_eq!(back, value, "{text:?} -> {rendered} did not round-trip");
    }
});
