//! Fuzz target: `store::parse_bool_body`
//!
//! Drives arbitrary response bodies into the scalar parser and asserts it
//! never panics and only ever accepts the four boolean spellings.
//!
//! cargo fuzz run fuzz_store_body

#![no_main]

use libfuzzer_sys::fuzz_target;
use railgate::store::parse_bool_body;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = parse_bool_body(data) {
        let text = core::str::from_utf8(data).expect("accepted body must be UTF-8");
        let token = text.trim_matches(|c: char| c.is_ascii_whitespace()).trim_matches('"');
        assert_eq!(token, if value { "true" } else { "false" });
    }
});
