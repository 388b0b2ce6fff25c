#![no_main]
use libfuzzer_sys::fuzz_target;
use slotplan_libs::bitmap::{decode, encode};

fuzz_target!(|data: &[u8]| {
    // arbitrary bytes must be refused or decode to a week that re-encodes cleanly
    if let Ok(week) = decode(data) {
        assert_eq!(decode(&encode(&week)), Ok(week));
    }
});
