#![no_main]

use libfuzzer_sys::fuzz_target;
use reliabill::delivery::webhook;

fuzz_target!(|data: &[u8]| {
    let _ = webhook::parse_event(data);
    let _ = webhook::verify_signature("fuzz-secret", data, std::str::from_utf8(data).ok());
});
