//! 7-of-8 payload packing.
//!
//! The display channel reserves the high bit of every byte on the wire for
//! terminal-protocol orders, so arbitrary binary data cannot travel
//! untouched. In 7-of-8 mode the sender strips the high bit of each data
//! byte and collects the stripped bits into an eighth byte: data byte *i*
//! of a group contributes bit `0x40 >> i` of the group's modifier byte.
//! Every byte on the wire therefore stays below `0x80`.
//!
//! Binary mode skips the transform entirely; it is usable when the channel
//! path is known to be eight-bit clean.
//!
//! Both directions are pure functions over byte slices. Packing zero-pads
//! the final group; unpacking yields `groups * 7` bytes, and callers trim
//! to the transmitted length carried in the frame header.

/// Payload encoding negotiated by the welcome handshake.
///
/// The welcome AID the outside proxy sends picks the variant; until a
/// welcome arrives the bridge assumes the packed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Seven data bytes travel as eight wire bytes.
    #[default]
    Packed7of8,
    /// Data bytes travel untranslated.
    Binary,
}

impl Encoding {
    /// Apply the inverse transform to an inbound payload region.
    ///
    /// For [`Encoding::Binary`] this is a plain copy.
    #[must_use]
    pub fn decode(self, wire: &[u8]) -> Vec<u8> {
        match self {
            Self::Packed7of8 => unpack_7of8(wire),
            Self::Binary => wire.to_vec(),
        }
    }
}

/// Pack `data` for the wire.
///
/// Each group of up to seven input bytes becomes exactly eight output
/// bytes; a short final group is zero-padded before its modifier byte.
#[must_use]
pub fn pack_7of8(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len().div_ceil(7) * 8);
    for chunk in data.chunks(7) {
        let mut modifier = 0u8;
        for (i, &byte) in chunk.iter().enumerate() {
            out.push(byte & 0x7F);
            if byte & 0x80 != 0 {
                modifier |= 0x40 >> i;
            }
        }
        out.resize(out.len() + (7 - chunk.len()), 0);
        out.push(modifier);
    }
    out
}

/// Unpack a wire region packed with [`pack_7of8`].
///
/// Produces seven bytes per complete eight-byte group; a trailing partial
/// group (malformed input) is ignored.
#[must_use]
pub fn unpack_7of8(wire: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(wire.len() / 8 * 7);
    for group in wire.chunks_exact(8) {
        let modifier = group[7];
        for (i, &byte) in group[..7].iter().enumerate() {
            if modifier & (0x40 >> i) != 0 {
                out.push(byte | 0x80);
            } else {
                out.push(byte);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert!(pack_7of8(&[]).is_empty());
        assert!(unpack_7of8(&[]).is_empty());
    }

    #[test]
    fn high_bits_collected() {
        let packed = pack_7of8(&[0x80, 0x01, 0xFF]);
        assert_eq!(packed.len(), 8);
        assert_eq!(&packed[..3], &[0x00, 0x01, 0x7F]);
        // byte 0 and byte 2 had their high bits stripped
        assert_eq!(packed[7], 0x40 | 0x10);
    }

    #[test]
    fn wire_bytes_stay_below_0x80() {
        let data: Vec<u8> = (0..=255).collect();
        assert!(pack_7of8(&data).iter().all(|&b| b < 0x80));
    }

    #[test]
    fn exact_identity_on_full_groups() {
        let data = b"fourteen bytes";
        assert_eq!(data.len() % 7, 0);
        assert_eq!(unpack_7of8(&pack_7of8(data)), data);
    }

    #[test]
    fn binary_mode_is_a_copy() {
        let data = vec![0x00, 0x80, 0xFF, 0x7F];
        assert_eq!(Encoding::Binary.decode(&data), data);
    }
}
