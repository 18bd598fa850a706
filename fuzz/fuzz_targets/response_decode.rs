//! Fuzz target for inbound data-frame parsing.
//!
//! Response parsing runs on bytes the outside proxy controls, in both
//! encodings. It must never panic: malformed input returns an error the
//! dispatcher answers with a reset.

#![no_main]

use hostlink_proto::{Encoding, Response};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Response::parse(data, Encoding::Packed7of8);
    let _ = Response::parse(data, Encoding::Binary);
});
