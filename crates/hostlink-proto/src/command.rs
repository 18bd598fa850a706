//! Outbound command templates for the dialed display channel.
//!
//! Eight distinct channel programs exist, each writing one frame to the
//! device. The write-control byte of the first command identifies the
//! handshake to the outside proxy, and every frame positions the terminal
//! buffer at its last cell so the peer can tell bridge output from
//! ordinary console traffic. The handshake frames are fixed byte strings;
//! only the data transmission is assembled per send.

use bytes::{BufMut, Bytes, BytesMut};

use crate::xmit::XmitHeader;

/// Write-control codes identifying each outbound frame.
pub mod wcc {
    /// "Hello, using 7-of-8 encoding".
    pub const WELCOME: u8 = 0x40;
    /// "Hello, using binary encoding".
    pub const WELCOME_BINARY: u8 = 0x4D;
    /// "I want to send".
    pub const WILL_SEND: u8 = 0xC1;
    /// "Acknowledge".
    pub const ACK: u8 = 0xC4;
    /// "You may send".
    pub const DO_SEND: u8 = 0xC5;
    /// "Resync: discard the dialogue in progress".
    pub const RESET: u8 = 0x4F;
    /// "Dump your state to your log".
    pub const DUMP: u8 = 0x4E;
    /// Data transmissions carry a zero write-control byte.
    pub const DATA: u8 = 0x00;
}

/// Buffer-positioning order addressing the last (12-bit) cell. All
/// outbound frames start with it after the write-control byte.
pub const SBA_LAST: [u8; 3] = [0x11, 0x7F, 0x7F];

const WELCOME_FRAME: &[u8] = b"\x40\x11\x7f\x7fHost-Welcome";
const WELCOME_BINARY_FRAME: &[u8] = b"\x4d\x11\x7f\x7fHost-Welcome-BIN";
const WILL_SEND_FRAME: &[u8] = b"\xc1\x11\x7f\x7fHost-WillSend";
const ACK_FRAME: &[u8] = b"\xc4\x11\x7f\x7fHost-Ack";
const DO_SEND_FRAME: &[u8] = b"\xc5\x11\x7f\x7fHost-DoSend";
const RESET_FRAME: &[u8] = b"\x4f\x11\x7f\x7fHost-Reset";
const DUMP_FRAME: &[u8] = b"\x4e\x11\x7f\x7fProxy-Dump";

// The takeover sequence paints two literal console frames rather than
// handshake tokens: the dial prompt and the post-dial banner.
const CP_READ_FRAME: &[u8] =
    b"\xc2\x11\x5b\x5f\x1d\xc1\x11\x5d\x6b\x1d-CP READ            ";
const DIALED_FRAME: &[u8] = b"\xc2\x11  DIALED TO me";

/// Outbound channel command selected by the dispatch state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Welcome the outside proxy in 7-of-8 mode.
    Welcome,
    /// Welcome the outside proxy in binary mode.
    WelcomeBinary,
    /// Request the send side of the half-duplex conversation.
    WillSend,
    /// Acknowledge the peer's last frame.
    Ack,
    /// Grant the peer the send side.
    DoSend,
    /// Resync after a protocol mismatch.
    Reset,
    /// Ask the outside proxy to dump its state.
    Dump,
    /// Paint the dial prompt during a takeover.
    CpRead,
    /// Paint the post-dial banner, completing a takeover.
    Dialed,
    /// Data transmission: 22-byte header, then the request payload.
    /// With an empty payload only the header is written.
    Xmit {
        /// Routing header for the slot being transmitted.
        header: XmitHeader,
        /// Request payload; may be empty.
        payload: Bytes,
    },
}

impl Command {
    /// Short name for transition logs and diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::WelcomeBinary => "welcome-binary",
            Self::WillSend => "will-send",
            Self::Ack => "ack",
            Self::DoSend => "do-send",
            Self::Reset => "reset",
            Self::Dump => "dump",
            Self::CpRead => "cp-read",
            Self::Dialed => "dialed",
            Self::Xmit { .. } => "xmit-packet",
        }
    }

    /// Full wire image of the channel program.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Welcome => Bytes::from_static(WELCOME_FRAME),
            Self::WelcomeBinary => Bytes::from_static(WELCOME_BINARY_FRAME),
            Self::WillSend => Bytes::from_static(WILL_SEND_FRAME),
            Self::Ack => Bytes::from_static(ACK_FRAME),
            Self::DoSend => Bytes::from_static(DO_SEND_FRAME),
            Self::Reset => Bytes::from_static(RESET_FRAME),
            Self::Dump => Bytes::from_static(DUMP_FRAME),
            Self::CpRead => Bytes::from_static(CP_READ_FRAME),
            Self::Dialed => Bytes::from_static(DIALED_FRAME),
            Self::Xmit { header, payload } => {
                let mut buf = BytesMut::with_capacity(XmitHeader::SIZE + payload.len());
                buf.put_slice(&header.to_bytes());
                buf.put_slice(payload);
                buf.freeze()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_frames_carry_their_write_control_byte() {
        assert_eq!(Command::Welcome.encode()[0], wcc::WELCOME);
        assert_eq!(Command::WelcomeBinary.encode()[0], wcc::WELCOME_BINARY);
        assert_eq!(Command::WillSend.encode()[0], wcc::WILL_SEND);
        assert_eq!(Command::Ack.encode()[0], wcc::ACK);
        assert_eq!(Command::DoSend.encode()[0], wcc::DO_SEND);
        assert_eq!(Command::Reset.encode()[0], wcc::RESET);
        assert_eq!(Command::Dump.encode()[0], wcc::DUMP);
    }

    #[test]
    fn handshake_frames_address_the_last_cell() {
        for cmd in [
            Command::Welcome,
            Command::WelcomeBinary,
            Command::WillSend,
            Command::Ack,
            Command::DoSend,
            Command::Reset,
            Command::Dump,
        ] {
            assert_eq!(&cmd.encode()[1..4], &SBA_LAST, "{}", cmd.name());
        }
    }

    #[test]
    fn empty_xmit_is_header_only() {
        let header = XmitHeader::new(*b"CLIENT01", 1, 2, 0);
        let cmd = Command::Xmit { header, payload: Bytes::new() };
        assert_eq!(cmd.encode().len(), XmitHeader::SIZE);
    }

    #[test]
    fn xmit_appends_payload_after_header() {
        let header = XmitHeader::new(*b"CLIENT01", 1, 2, 3);
        let cmd = Command::Xmit { header, payload: Bytes::from_static(b"hello") };
        let wire = cmd.encode();
        assert_eq!(wire.len(), XmitHeader::SIZE + 5);
        assert_eq!(&wire[XmitHeader::SIZE..], b"hello");
        assert_eq!(wire[0], wcc::DATA);
    }
}
