//! Fuzz target for the 7-of-8 codec round-trip law.
//!
//! For any input up to the packet maximum, unpacking the packed image
//! must restore the original bytes exactly, and every packed byte must
//! keep its high bit clear.

#![no_main]

use hostlink_proto::{pack_7of8, unpack_7of8};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(2048)];

    let packed = pack_7of8(data);
    assert!(packed.iter().all(|&b| b < 0x80));

    let unpacked = unpack_7of8(&packed);
    assert_eq!(&unpacked[..data.len()], data);
});
