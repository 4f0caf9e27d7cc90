#![no_main]

use datascribe::{format_size, parse_size};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(bytes) = parse_size(text) {
            let _ = parse_size(&format_size(bytes));
        }
    }
});
