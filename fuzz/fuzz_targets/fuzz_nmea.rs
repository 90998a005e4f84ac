//! Fuzz target: `GpsReader` line assembly and `parse_rmc`
//!
//! Feeds arbitrary bytes through the simulated receiver (partial lines,
//! overlong lines, binary noise) and straight into the sentence parser.
//! Neither may panic, and any fix produced must be a finite coordinate in
//! range.
//!
//! cargo fuzz run fuzz_nmea

#![no_main]

use libfuzzer_sys::fuzz_target;
use railgate::app::ports::LocationPort;
use railgate::sensors::gps::{parse_rmc, GpsReader};

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = core::str::from_utf8(data) {
        if let Ok(s) = parse_rmc(line) {
            assert!(s.latitude.abs() <= 90.0 && s.longitude.abs() <= 180.0);
        }
    }

    let Ok(mut gps) = GpsReader::new() else { return };
    gps.sim_push_bytes(data);
    let s = gps.read_sample();
    assert!(s.latitude.is_finite() && s.longitude.is_finite());
});
