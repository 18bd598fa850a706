//! Error types for the bridge runtime.
//!
//! Almost nothing in the bridge is fatal: protocol mismatches resync,
//! channel write failures are logged, substrate receive failures leave
//! the slot for the next takeover. Only startup can fail hard.

use thiserror::Error;

use crate::vmcf::VmcfError;

/// Fatal bridge failures.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The messaging substrate refused to authorize this process.
    #[error("substrate authorization failed: {0}")]
    Authorize(#[source] VmcfError),

    /// The dial channel could not be set up.
    #[error("dial channel setup failed: {0}")]
    DialSetup(#[from] std::io::Error),
}
