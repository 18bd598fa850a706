//! The inter-VM messaging facade.
//!
//! The bridge consumes the host's message-passing substrate through the
//! [`VmcfPort`] trait: authorize on startup (with control messages
//! enabled), then receive request payloads, deliver replies, and issue
//! rejects. Request arrival and control messages are *signals*, not trait
//! calls: they model the external interrupt and reach the runtime over
//! its event queue.
//!
//! [`MemoryVmcf`] is the in-process substrate used by the binary and the
//! tests: client code holds a [`MemoryVmcfHandle`] and issues
//! send-and-receive calls that resolve to a reply or a reject.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use hostlink_core::{RejectReason, RequestHeader, VmId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors surfaced by the messaging substrate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmcfError {
    /// The substrate refused to authorize this process.
    #[error("substrate authorization failed: {0}")]
    Authorize(String),

    /// An operation ran before [`VmcfPort::authorize`].
    #[error("substrate not authorized")]
    NotAuthorized,

    /// No pending message matches the given origin and message id.
    #[error("no pending message from {origin} with id {msg_id}")]
    UnknownMessage {
        /// Origin VM named in the operation.
        origin: VmId,
        /// Message id named in the operation.
        msg_id: u32,
    },
}

/// The operations the bridge performs against the substrate.
pub trait VmcfPort {
    /// Authorize the substrate for this process, control messages included.
    /// Failure here is fatal at startup.
    fn authorize(&mut self) -> Result<(), VmcfError>;

    /// Deauthorize on shutdown.
    fn deauthorize(&mut self);

    /// Read the payload of a pending request, up to `max_len` bytes.
    ///
    /// Callers must only invoke this from the device-interrupt role of
    /// the event loop; see the runtime module docs.
    fn receive(&mut self, origin: VmId, msg_id: u32, max_len: usize) -> Result<Bytes, VmcfError>;

    /// Deliver the response for a pending request.
    fn reply(
        &mut self,
        origin: VmId,
        msg_id: u32,
        user_word1: u32,
        user_word2: u32,
        payload: &[u8],
    ) -> Result<(), VmcfError>;

    /// Refuse a pending request.
    fn reject(&mut self, origin: VmId, msg_id: u32, reason: RejectReason)
    -> Result<(), VmcfError>;
}

/// A short control message addressed to the bridge process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smsg {
    /// VM that sent the message.
    pub origin: VmId,
    /// Message text.
    pub text: String,
}

/// Control commands the bridge recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Terminate the event loop and exit cleanly.
    Shutdown,
    /// Emit the diagnostics report and ask the outside proxy to dump too.
    Stat,
}

impl Smsg {
    /// Interpret the message. Shutdown is honored only from the
    /// privileged origin; everything unrecognized is `None`.
    #[must_use]
    pub fn command(&self) -> Option<ControlCommand> {
        match self.text.as_str() {
            "END" if self.origin == VmId::MAINT => Some(ControlCommand::Shutdown),
            "STAT" => Some(ControlCommand::Stat),
            _ => None,
        }
    }
}

/// Signals the substrate raises toward the bridge (the external
/// interrupt, reduced to messages on the runtime queue).
#[derive(Debug)]
pub enum SubstrateSignal {
    /// A client send-and-receive call arrived; metadata only.
    Request(RequestHeader),
    /// A control message arrived.
    Control(Smsg),
}

/// Outcome of a client send-and-receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutcome {
    /// The outside proxy answered.
    Reply {
        /// First user word of the response.
        user_word1: u32,
        /// Second user word of the response.
        user_word2: u32,
        /// Response payload.
        payload: Bytes,
    },
    /// The bridge refused or abandoned the request.
    Reject {
        /// Why the request was refused.
        reason: RejectReason,
    },
}

struct PendingMessage {
    payload: Bytes,
    done: oneshot::Sender<ClientOutcome>,
}

type PendingMap = Arc<Mutex<HashMap<(VmId, u32), PendingMessage>>>;

/// In-process messaging substrate backed by channels.
pub struct MemoryVmcf {
    authorized: bool,
    pending: PendingMap,
}

impl MemoryVmcf {
    /// Create the substrate, the client handle, and the signal stream the
    /// runtime listens on.
    #[must_use]
    pub fn new() -> (Self, MemoryVmcfHandle, mpsc::UnboundedReceiver<SubstrateSignal>) {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let port = Self { authorized: false, pending: Arc::clone(&pending) };
        let handle = MemoryVmcfHandle { pending, signals: signals_tx };
        (port, handle, signals_rx)
    }

    fn take(&self, origin: VmId, msg_id: u32) -> Result<PendingMessage, VmcfError> {
        self.pending
            .lock()
            .expect("substrate lock poisoned")
            .remove(&(origin, msg_id))
            .ok_or(VmcfError::UnknownMessage { origin, msg_id })
    }
}

impl VmcfPort for MemoryVmcf {
    fn authorize(&mut self) -> Result<(), VmcfError> {
        self.authorized = true;
        tracing::debug!("substrate authorized with control messages enabled");
        Ok(())
    }

    fn deauthorize(&mut self) {
        self.authorized = false;
        tracing::debug!("substrate deauthorized");
    }

    fn receive(&mut self, origin: VmId, msg_id: u32, max_len: usize) -> Result<Bytes, VmcfError> {
        if !self.authorized {
            return Err(VmcfError::NotAuthorized);
        }
        let pending = self.pending.lock().expect("substrate lock poisoned");
        let message = pending
            .get(&(origin, msg_id))
            .ok_or(VmcfError::UnknownMessage { origin, msg_id })?;
        let len = message.payload.len().min(max_len);
        Ok(message.payload.slice(..len))
    }

    fn reply(
        &mut self,
        origin: VmId,
        msg_id: u32,
        user_word1: u32,
        user_word2: u32,
        payload: &[u8],
    ) -> Result<(), VmcfError> {
        if !self.authorized {
            return Err(VmcfError::NotAuthorized);
        }
        let message = self.take(origin, msg_id)?;
        let outcome = ClientOutcome::Reply {
            user_word1,
            user_word2,
            payload: Bytes::copy_from_slice(payload),
        };
        // a client that gave up waiting is not an error for the bridge
        let _ = message.done.send(outcome);
        Ok(())
    }

    fn reject(
        &mut self,
        origin: VmId,
        msg_id: u32,
        reason: RejectReason,
    ) -> Result<(), VmcfError> {
        let message = self.take(origin, msg_id)?;
        let _ = message.done.send(ClientOutcome::Reject { reason });
        Ok(())
    }
}

/// Client side of [`MemoryVmcf`]: issues send-and-receive calls and
/// control messages.
#[derive(Clone)]
pub struct MemoryVmcfHandle {
    pending: PendingMap,
    signals: mpsc::UnboundedSender<SubstrateSignal>,
}

impl MemoryVmcfHandle {
    /// Issue a send-and-receive call. The returned channel resolves to
    /// the reply or reject; it stays forever pending if the bridge shut
    /// down before answering.
    pub fn send_and_receive(
        &self,
        origin: VmId,
        msg_id: u32,
        user_word1: u32,
        user_word2: u32,
        payload: impl Into<Bytes>,
    ) -> oneshot::Receiver<ClientOutcome> {
        let payload = payload.into();
        let (done, outcome) = oneshot::channel();

        let header = RequestHeader { origin, msg_id, user_word1, user_word2, len: payload.len() };
        self.pending
            .lock()
            .expect("substrate lock poisoned")
            .insert((origin, msg_id), PendingMessage { payload, done });

        if self.signals.send(SubstrateSignal::Request(header)).is_err() {
            tracing::warn!(%origin, msg_id, "bridge is gone, request not delivered");
        }
        outcome
    }

    /// Send a control message to the bridge.
    pub fn send_control(&self, origin: VmId, text: &str) {
        let smsg = Smsg { origin, text: text.to_owned() };
        if self.signals.send(SubstrateSignal::Control(smsg)).is_err() {
            tracing::warn!(%origin, text, "bridge is gone, control message not delivered");
        }
    }
}
