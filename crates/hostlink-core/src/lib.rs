//! Core logic for the hostlink bridge: the slot table, the half-duplex
//! dispatch state machine, and the diagnostic surfaces.
//!
//! Everything here is sans-IO. The [`Dispatcher`] consumes channel events
//! and client-request metadata and returns [`Action`]s; the runtime crate
//! executes those actions against the messaging substrate and the dial
//! channel. Keeping the state machine pure makes every protocol scenario
//! drivable from a plain unit test.

mod dispatch;
mod logring;
mod report;
mod slot;

pub use dispatch::{Action, ChannelEvent, Dispatcher, ProtocolState, RejectReason, RequestHeader};
pub use logring::{LOG_RING_LEN, LogRing};
pub use report::{Diagnostics, SlotSummary};
pub use slot::{SLOT_COUNT, Slot, SlotState, SlotTable, VmId};
