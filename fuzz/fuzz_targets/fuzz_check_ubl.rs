#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must yield a problem list, never a panic.
    let _ = reliabill::documents::check_ubl(data);
});
