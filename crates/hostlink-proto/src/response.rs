//! Inbound transmission parsing.
//!
//! A transmission from the outside proxy opens with an AID byte and ten
//! bytes of transport framing the bridge skips. Data frames then carry a
//! demultiplexing header {slot, user-word-1, user-word-2, transmit
//! length} followed by the payload; the whole region after the framing is
//! subject to the negotiated [`Encoding`]. Handshake frames carry nothing
//! the bridge reads beyond the AID, except for the want-send suffix on
//! acks and the console input echoed during a takeover.

use bytes::Bytes;

use crate::{
    aid::Aid,
    encoding::Encoding,
    errors::{ProtocolError, Result},
};

/// Bytes skipped at the start of every transmission: the AID plus ten
/// bytes of transport framing.
pub const FRAMING_SKIP: usize = 11;

/// Minimum transmission length acceptable for a data frame.
pub const MIN_DATA_LEN: usize = 21;

/// Size of the demultiplexing header inside the data region.
const DEMUX_HEADER_LEN: usize = 12;

/// Classify an inbound transmission by its AID byte.
///
/// # Errors
///
/// - [`ProtocolError::Empty`] on a zero-length transmission
/// - [`ProtocolError::UnknownAid`] when the first byte is unrecognized
pub fn classify(bytes: &[u8]) -> Result<Aid> {
    let first = bytes.first().ok_or(ProtocolError::Empty)?;
    Aid::from_byte(*first).ok_or(ProtocolError::UnknownAid(*first))
}

/// True when an ack carries the want-send suffix: the peer confirms our
/// data frame and immediately requests the send side.
#[must_use]
pub fn has_want_send_suffix(bytes: &[u8]) -> bool {
    bytes.len() > 3 && bytes[3] == Aid::WantSend.to_byte()
}

/// True when console input during a takeover begins a DIAL command.
///
/// The input echo places the command text at byte 6 of the transmission.
#[must_use]
pub fn dial_command_follows(bytes: &[u8]) -> bool {
    bytes.len() >= 11 && &bytes[6..11] == b"DIAL "
}

/// A demultiplexed response extracted from a data transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Slot index the outside proxy copied from our transmit header.
    pub slot_index: u16,
    /// First user word, as the outside proxy placed it.
    pub user_word1: u32,
    /// Second user word, as the outside proxy placed it.
    pub user_word2: u32,
    /// Response payload, already decoded.
    pub payload: Bytes,
    /// True when the declared transmit length exceeded the bytes present
    /// and the payload was clamped to the residue.
    pub truncated: bool,
}

impl Response {
    /// Parse the transmission of a data frame.
    ///
    /// `bytes` is the full transmission including the AID; `encoding` is
    /// the mode negotiated at welcome time and applies to everything past
    /// the transport framing.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::TooShort`] when the transmission cannot hold the
    /// demultiplexing header. The dispatcher answers this with `Reset`.
    pub fn parse(bytes: &[u8], encoding: Encoding) -> Result<Self> {
        if bytes.len() < MIN_DATA_LEN {
            return Err(ProtocolError::TooShort { expected: MIN_DATA_LEN, actual: bytes.len() });
        }

        let decoded = encoding.decode(&bytes[FRAMING_SKIP..]);
        if decoded.len() < DEMUX_HEADER_LEN {
            return Err(ProtocolError::TooShort {
                expected: FRAMING_SKIP + DEMUX_HEADER_LEN,
                actual: FRAMING_SKIP + decoded.len(),
            });
        }

        let slot_index = u16::from_be_bytes([decoded[0], decoded[1]]);
        let user_word1 = u32::from_be_bytes([decoded[2], decoded[3], decoded[4], decoded[5]]);
        let user_word2 = u32::from_be_bytes([decoded[6], decoded[7], decoded[8], decoded[9]]);
        let declared = usize::from(u16::from_be_bytes([decoded[10], decoded[11]]));

        let residue = decoded.len() - DEMUX_HEADER_LEN;
        let taken = declared.min(residue);
        let payload = Bytes::copy_from_slice(&decoded[DEMUX_HEADER_LEN..DEMUX_HEADER_LEN + taken]);

        Ok(Self {
            slot_index,
            user_word1,
            user_word2,
            payload,
            truncated: declared > residue,
        })
    }
}
