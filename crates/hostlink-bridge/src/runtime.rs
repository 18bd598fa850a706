//! The bridge event loop.
//!
//! A single task owns the dispatcher and both ports and drains one queue
//! of events: client requests and control messages from the substrate,
//! attention/device-end/read-completion signals from the dial channel.
//! Executing everything on one instruction stream is what makes the
//! critical ordering rule hold by construction: a substrate receive runs
//! only inside [`Action::Transmit`] handling, and no reply can be issued
//! while that receive is in progress, because both are executed inline by
//! the same task in action order.

use bytes::Bytes;
use hostlink_core::{Action, ChannelEvent, Dispatcher};
use hostlink_proto::{Command, XmitHeader};
use tokio::sync::mpsc;

use crate::{
    dial::{DialPort, DialSignal},
    error::BridgeError,
    vmcf::{ControlCommand, Smsg, SubstrateSignal, VmcfPort},
};

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Shutdown,
}

/// The bridge runtime: dispatcher plus ports, driven by two signal
/// streams merged into one serialized event loop.
pub struct Runtime<V, D>
where
    V: VmcfPort,
    D: DialPort,
{
    dispatcher: Dispatcher,
    vmcf: V,
    dial: D,
    substrate: mpsc::UnboundedReceiver<SubstrateSignal>,
    channel: mpsc::UnboundedReceiver<DialSignal>,
}

impl<V, D> Runtime<V, D>
where
    V: VmcfPort,
    D: DialPort,
{
    /// Assemble a runtime over the given ports and their signal streams.
    pub fn new(
        vmcf: V,
        dial: D,
        substrate: mpsc::UnboundedReceiver<SubstrateSignal>,
        channel: mpsc::UnboundedReceiver<DialSignal>,
    ) -> Self {
        Self { dispatcher: Dispatcher::new(), vmcf, dial, substrate, channel }
    }

    /// Run until the privileged END control message arrives or every
    /// signal source is gone.
    ///
    /// # Errors
    ///
    /// Only startup can fail: [`BridgeError::Authorize`] when the
    /// substrate refuses this process. Everything after that is handled
    /// by the protocol itself.
    pub async fn run(mut self) -> Result<(), BridgeError> {
        self.vmcf.authorize().map_err(BridgeError::Authorize)?;
        tracing::info!("bridge ready, waiting for the outside proxy to dial in");

        loop {
            let flow = tokio::select! {
                signal = self.substrate.recv() => match signal {
                    Some(SubstrateSignal::Request(header)) => {
                        let actions = self.dispatcher.on_client_request(header);
                        self.execute(actions);
                        Flow::Continue
                    },
                    Some(SubstrateSignal::Control(smsg)) => self.handle_control(&smsg),
                    None => Flow::Shutdown,
                },
                signal = self.channel.recv() => match signal {
                    Some(signal) => {
                        let event = channel_event(signal);
                        let actions = self.dispatcher.on_channel_event(event);
                        self.execute(actions);
                        Flow::Continue
                    },
                    None => Flow::Shutdown,
                },
            };

            if flow == Flow::Shutdown {
                break;
            }
        }

        self.vmcf.deauthorize();
        tracing::info!(
            requests = self.dispatcher.diagnostics().requests_accepted,
            "bridge stopped"
        );
        Ok(())
    }

    fn handle_control(&mut self, smsg: &Smsg) -> Flow {
        match smsg.command() {
            Some(ControlCommand::Shutdown) => {
                tracing::info!(origin = %smsg.origin, "END received, shutting down");
                Flow::Shutdown
            },
            Some(ControlCommand::Stat) => {
                let report = self.dispatcher.diagnostics();
                tracing::info!("STAT requested\n{report}");
                let actions = self.dispatcher.request_dump();
                self.execute(actions);
                Flow::Continue
            },
            None => {
                tracing::debug!(
                    origin = %smsg.origin,
                    text = %smsg.text,
                    "unrecognized control message ignored"
                );
                Flow::Continue
            },
        }
    }

    /// Execute dispatcher actions, in order.
    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Issue(command) => self.dial.issue(command.encode()),
                Action::BeginRead => self.dial.begin_read(),
                Action::Transmit { slot_index } => self.transmit(slot_index),
                Action::Reply {
                    slot_index: _,
                    origin,
                    msg_id,
                    user_word1,
                    user_word2,
                    payload,
                } => {
                    if let Err(err) =
                        self.vmcf.reply(origin, msg_id, user_word1, user_word2, &payload)
                    {
                        tracing::warn!(%err, %origin, msg_id, "reply delivery failed");
                    }
                },
                Action::Release { slot_index } => self.dispatcher.release(slot_index),
                Action::Reject { origin, msg_id, reason } => {
                    if let Err(err) = self.vmcf.reject(origin, msg_id, reason) {
                        tracing::warn!(%err, %origin, msg_id, "reject delivery failed");
                    }
                },
            }
        }
    }

    /// Receive the request payload and write the transmit frame.
    ///
    /// The substrate receive happens here and nowhere else. A receive
    /// issued from the request-arrival path could overlap a reply issued
    /// from this path, and with both in flight the substrate delivers
    /// data to the wrong buffer.
    fn transmit(&mut self, slot_index: u16) {
        let Some(slot) = self.dispatcher.slots().lookup(slot_index) else {
            tracing::warn!(slot_index, "transmit for a slot that does not exist");
            return;
        };
        let (origin, msg_id, len) = (slot.origin(), slot.msg_id(), slot.request_len());
        let (user_word1, user_word2) = (slot.user_word1(), slot.user_word2());

        let payload = match self.vmcf.receive(origin, msg_id, len) {
            Ok(payload) => payload,
            Err(err) => {
                // transmit anyway; the slot stays in flight and is cleaned
                // up by a reject on the next takeover
                tracing::warn!(
                    %err,
                    %origin,
                    msg_id,
                    "substrate receive failed, transmitting a blank payload"
                );
                Bytes::from(vec![0u8; len])
            },
        };
        self.dispatcher.bind_payload(slot_index, &payload);

        let header = XmitHeader::new(*origin.as_bytes(), user_word1, user_word2, slot_index);
        self.dial.issue(Command::Xmit { header, payload }.encode());
    }
}

fn channel_event(signal: DialSignal) -> ChannelEvent {
    match signal {
        DialSignal::Attention => ChannelEvent::Attention,
        DialSignal::DeviceEnd => ChannelEvent::DeviceEnd,
        DialSignal::ReadCompleted(bytes) => ChannelEvent::ReadCompleted(bytes),
        DialSignal::Stray(status) => ChannelEvent::Stray(status),
    }
}
