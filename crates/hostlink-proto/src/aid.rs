//! Attention-identifier classification for inbound transmissions.
//!
//! Every transmission from the outside proxy begins with a one-byte AID
//! identifying which key or channel event triggered the send. The proxy
//! repurposes the function-key codes as handshake tokens.

/// One-byte attention identifier opening every inbound transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Aid {
    /// Acknowledge.
    Ack = 0xF1,
    /// Welcome; selects the 7-of-8 payload encoding.
    Welcome7of8 = 0xF2,
    /// Acknowledge combined with a transfer request.
    AckWantSend = 0xF3,
    /// Data frame, with more to follow.
    DataWantSend = 0xF4,
    /// Transfer request: the outside proxy has data for us.
    WantSend = 0xF5,
    /// Welcome; selects the binary payload encoding.
    WelcomeBinary = 0xF9,
    /// Data frame (Enter key). Also carries console input while a takeover
    /// is in progress.
    Enter = 0x7D,
    /// Takeover request (Clear key): another outside proxy wants the line.
    Clear = 0x6D,
}

impl Aid {
    /// Classify a raw AID byte. `None` for anything unrecognized.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0xF1 => Some(Self::Ack),
            0xF2 => Some(Self::Welcome7of8),
            0xF3 => Some(Self::AckWantSend),
            0xF4 => Some(Self::DataWantSend),
            0xF5 => Some(Self::WantSend),
            0xF9 => Some(Self::WelcomeBinary),
            0x7D => Some(Self::Enter),
            0x6D => Some(Self::Clear),
            _ => None,
        }
    }

    /// Raw wire byte for this identifier.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// True for the two frame kinds that carry a demultiplexed response.
    #[must_use]
    pub fn carries_data(self) -> bool {
        matches!(self, Self::DataWantSend | Self::Enter)
    }
}
