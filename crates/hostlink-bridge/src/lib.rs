//! Runtime and I/O ports for the hostlink inside proxy.
//!
//! This crate wraps the sans-IO dispatcher from [`hostlink_core`] with
//! real I/O. The [`Runtime`] drains a single serialized event queue fed
//! by two port types:
//!
//! - [`VmcfPort`]: the inter-VM messaging substrate ([`MemoryVmcf`] is
//!   the in-process implementation used by the binary and tests);
//! - [`DialPort`]: the dialed display channel ([`TcpDialServer`] lets
//!   the outside proxy dial in over TCP, [`MemoryDial`] scripts it in
//!   tests).
//!
//! # Ordering guarantee
//!
//! The runtime is one task. Substrate receives happen only while a
//! transmit action is being executed, and substrate replies happen only
//! while a reply action is being executed, never concurrently. This is
//! the safety requirement the whole design hangs on; see the runtime
//! module documentation.

mod dial;
mod error;
mod runtime;
mod vmcf;

pub use dial::{DialPort, DialSignal, MemoryDial, MemoryDialDriver, TcpDialServer};
pub use error::BridgeError;
pub use runtime::Runtime;
pub use vmcf::{
    ClientOutcome, ControlCommand, MemoryVmcf, MemoryVmcfHandle, Smsg, SubstrateSignal, VmcfError,
    VmcfPort,
};
