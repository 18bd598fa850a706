//! Transmit header: the fixed 22-byte prefix of every data transmission.
//!
//! Outbound data frames always position the terminal buffer at its last
//! cell; the outside proxy recognizes that order as "this transmission
//! originates from the bridge". The header then names the origin VM, the
//! two opaque user words, and the slot index the response must be routed
//! back to. Multi-byte integers are big-endian, and fields are raw byte
//! arrays so the struct can be cast to and from wire bytes without copies.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    command::{SBA_LAST, wcc},
    errors::{ProtocolError, Result},
};

/// Fixed 22-byte header opening every outbound data transmission.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct XmitHeader {
    /// Write-control byte; zero for data transmissions.
    write_control: u8,
    /// Buffer-positioning order; always addresses the last cell.
    positioning: [u8; 3],
    /// Origin VM, eight characters space-padded.
    origin: [u8; 8],
    /// First opaque user word.
    user_word1: [u8; 4],
    /// Second opaque user word.
    user_word2: [u8; 4],
    /// Slot index the response is routed back to.
    slot: [u8; 2],
}

impl XmitHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 22;

    /// Build a header for one request slot.
    #[must_use]
    pub fn new(origin: [u8; 8], user_word1: u32, user_word2: u32, slot: u16) -> Self {
        Self {
            write_control: wcc::DATA,
            positioning: SBA_LAST,
            origin,
            user_word1: user_word1.to_be_bytes(),
            user_word2: user_word2.to_be_bytes(),
            slot: slot.to_be_bytes(),
        }
    }

    /// Parse a header from wire bytes without copying.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::TooShort`] if fewer than 22 bytes are present
    /// - [`ProtocolError::BadPositioningOrder`] if the positioning order
    ///   does not address the last buffer cell
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::TooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if header.positioning != SBA_LAST {
            return Err(ProtocolError::BadPositioningOrder);
        }

        Ok(header)
    }

    /// Serialize the header to its wire image.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Origin VM bytes.
    #[must_use]
    pub fn origin(&self) -> &[u8; 8] {
        &self.origin
    }

    /// First opaque user word.
    #[must_use]
    pub fn user_word1(&self) -> u32 {
        u32::from_be_bytes(self.user_word1)
    }

    /// Second opaque user word.
    #[must_use]
    pub fn user_word2(&self) -> u32 {
        u32::from_be_bytes(self.user_word2)
    }

    /// Slot index.
    #[must_use]
    pub fn slot_index(&self) -> u16 {
        u16::from_be_bytes(self.slot)
    }
}

impl std::fmt::Debug for XmitHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmitHeader")
            .field("origin", &String::from_utf8_lossy(&self.origin))
            .field("user_word1", &format!("{:#010x}", self.user_word1()))
            .field("user_word2", &format!("{:#010x}", self.user_word2()))
            .field("slot", &self.slot_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<XmitHeader>(), XmitHeader::SIZE);
        assert_eq!(XmitHeader::SIZE, 22);
    }

    #[test]
    fn reject_short_buffer() {
        let result = XmitHeader::from_bytes(&[0u8; 10]);
        assert_eq!(result, Err(ProtocolError::TooShort { expected: 22, actual: 10 }));
    }

    #[test]
    fn reject_bad_positioning_order() {
        let mut bytes = XmitHeader::new(*b"CLIENT01", 0, 0, 0).to_bytes();
        bytes[2] = 0x00;
        assert_eq!(XmitHeader::from_bytes(&bytes), Err(ProtocolError::BadPositioningOrder));
    }

    proptest! {
        #[test]
        fn header_round_trip(
            origin in prop::array::uniform8(0x20u8..0x7F),
            uw1 in any::<u32>(),
            uw2 in any::<u32>(),
            slot in any::<u16>(),
        ) {
            let header = XmitHeader::new(origin, uw1, uw2, slot);
            let bytes = header.to_bytes();

            let parsed = XmitHeader::from_bytes(&bytes).expect("should parse");
            prop_assert_eq!(parsed.origin(), &origin);
            prop_assert_eq!(parsed.user_word1(), uw1);
            prop_assert_eq!(parsed.user_word2(), uw2);
            prop_assert_eq!(parsed.slot_index(), slot);
        }
    }
}
