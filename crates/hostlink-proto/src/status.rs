//! Channel status word delivered with device interrupts.
//!
//! Only two conditions drive the protocol: attention (the peer has data)
//! and device-end (our outbound command completed). Everything else is
//! diagnostic and surfaces in the stray-status counter.

/// Status word accompanying a device interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStatus(u32);

impl ChannelStatus {
    /// The attached device requests attention: inbound data is waiting.
    pub const ATTENTION: u32 = 0x8000_0000;
    /// The outstanding channel program has been consumed by the device.
    pub const DEVICE_END: u32 = 0x0400_0000;
    /// Channel-end accompanies device-end on this device class.
    pub const CHANNEL_END: u32 = 0x0800_0000;
    /// The device reported an error condition.
    pub const UNIT_CHECK: u32 = 0x0200_0000;

    /// Wrap a raw status word.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw status word, for diagnostics.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Attention condition present?
    #[must_use]
    pub fn attention(self) -> bool {
        self.0 & Self::ATTENTION != 0
    }

    /// Device-end condition present?
    #[must_use]
    pub fn device_end(self) -> bool {
        self.0 & Self::DEVICE_END != 0
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)?;
        if self.attention() {
            write!(f, " attention")?;
        }
        if self.device_end() {
            write!(f, " device-end")?;
        }
        Ok(())
    }
}
