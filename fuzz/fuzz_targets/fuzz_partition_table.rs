#![no_main]

use datascribe::mount::parse_partition_table;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let report = String::from_utf8_lossy(data);
    if let Ok(partitions) = parse_partition_table("/dev/loop0", &report) {
        for partition in partitions {
            assert!(partition.device.starts_with("/dev/loop0p"));
        }
    }
});
