#![no_main]

use datascribe::embedded::{HeuristicPolicy, archive_signature, count_signature_hits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = archive_signature(data);
    let report = String::from_utf8_lossy(data);
    let hits = count_signature_hits(&report, &HeuristicPolicy::default());
    assert!(hits <= report.lines().count());
});
