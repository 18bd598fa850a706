//! Wire protocol for the hostlink display-channel bridge.
//!
//! The bridge talks to its outside proxy over a dialed display device used
//! as a raw byte channel. This crate defines both directions of that
//! conversation as plain data:
//!
//! - Outbound: [`Command`] templates, each a fixed handshake frame or a
//!   data transmission built from an [`XmitHeader`] plus payload.
//! - Inbound: [`Aid`] classification of each transmission, [`Response`]
//!   parsing for data frames, and the [`Encoding`] applied to the payload
//!   region.
//!
//! Nothing in this crate performs I/O or holds connection state; the
//! dispatch state machine consumes and produces these types.

mod aid;
mod command;
mod encoding;
mod errors;
mod response;
mod status;
mod xmit;

pub use aid::Aid;
pub use command::{Command, SBA_LAST, wcc};
pub use encoding::{Encoding, pack_7of8, unpack_7of8};
pub use errors::{ProtocolError, Result};
pub use response::{
    FRAMING_SKIP, MIN_DATA_LEN, Response, classify, dial_command_follows, has_want_send_suffix,
};
pub use status::ChannelStatus;
pub use xmit::XmitHeader;

/// Largest payload a single request or response may carry.
pub const MAX_PACKET_LEN: usize = 2048;

/// Size of the inbound read buffer: a 7-of-8 encoded maximum payload plus
/// header and framing overhead.
pub const RECV_BUFFER_LEN: usize = 2560;
