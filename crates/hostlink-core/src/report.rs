//! Diagnostic snapshot rendered by the STAT control command.
//!
//! The snapshot is assembled from live dispatcher state and rendered as a
//! multi-line report: ring occupancy, protocol state, per-slot usage, the
//! counters, and the transition log replayed in order.

use hostlink_proto::Encoding;

use crate::slot::{SlotState, VmId};

/// One busy slot in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    /// Stable slot index.
    pub index: u16,
    /// Lifecycle state at snapshot time.
    pub state: SlotState,
    /// Originating VM.
    pub origin: VmId,
    /// Substrate message id.
    pub msg_id: u32,
    /// First opaque user word.
    pub user_word1: u32,
    /// Second opaque user word.
    pub user_word2: u32,
}

/// Point-in-time view of the bridge for the STAT report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// Protocol state name.
    pub state: &'static str,
    /// Is an inbound read outstanding?
    pub reading: bool,
    /// Negotiated payload encoding.
    pub encoding: Encoding,
    /// Slots in the free ring.
    pub free: usize,
    /// Slots waiting in the transmit queue.
    pub queued: usize,
    /// Slots transmitted and awaiting a response.
    pub in_flight: usize,
    /// Client requests accepted since startup.
    pub requests_accepted: u64,
    /// Replies delivered since startup.
    pub replies_delivered: u64,
    /// Channel statuses observed that drove no transition.
    pub stray_statuses: u64,
    /// Name of the most recently issued channel command.
    pub last_command: &'static str,
    /// Every slot currently carrying a request, in index order.
    pub busy: Vec<SlotSummary>,
    /// Transition log, oldest entry first.
    pub log: Vec<&'static str>,
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "current request status ::")?;
        writeln!(
            f,
            "  slots free: {}  queued: {}  in flight: {}",
            self.free, self.queued, self.in_flight
        )?;
        writeln!(f, "current transmission status ::")?;
        writeln!(f, "  state ...........: {}", self.state)?;
        writeln!(f, "  inbound read ....: {}", self.reading)?;
        writeln!(f, "  binary transfer .: {}", self.encoding == Encoding::Binary)?;
        writeln!(f, "  last command ....: {}", self.last_command)?;
        writeln!(
            f,
            "  requests: {}  replies: {}  stray statuses: {}",
            self.requests_accepted, self.replies_delivered, self.stray_statuses
        )?;
        writeln!(f, "slot usage ::")?;
        for slot in &self.busy {
            writeln!(
                f,
                "  slot[{}]: {:?} origin {} msgid {} uw1 {:#010x} uw2 {:#010x}",
                slot.index, slot.state, slot.origin, slot.msg_id, slot.user_word1, slot.user_word2
            )?;
        }
        writeln!(f, "-- begin last log entries")?;
        for entry in &self.log {
            writeln!(f, "{entry}")?;
        }
        writeln!(f, "-- end last log entries (count: {})", self.log.len())
    }
}
