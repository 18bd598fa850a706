//! The half-duplex dispatch state machine.
//!
//! This is the heart of the bridge. It reconciles three asynchronous
//! streams (client requests from the messaging substrate, device-end
//! interrupts for our own outbound frames, and attention/data interrupts
//! for inbound transmissions) into a single half-duplex conversation
//! with the outside proxy.
//!
//! The machine is pure: it consumes [`ChannelEvent`]s and request
//! metadata and returns [`Action`]s for the runtime to execute, in order.
//! Every state `S` that rides an outbound channel command has a pending
//! companion `S-pending`, entered when the command is issued and promoted
//! to `S` by the command's device-end interrupt.
//!
//! Protocol mismatches are not errors: the machine answers them with the
//! `Reset` resync handshake and keeps going. The only place in-flight
//! requests are abandoned is a proxy takeover (Clear followed by a DIAL
//! command), which rejects every busy slot back to its origin.

use bytes::Bytes;
use hostlink_proto::{
    Aid, ChannelStatus, Command, Encoding, MIN_DATA_LEN, Response, classify,
    dial_command_follows, has_want_send_suffix,
};

use crate::{
    logring::LogRing,
    report::{Diagnostics, SlotSummary},
    slot::{SlotState, SlotTable, VmId},
};

/// Protocol state of the half-duplex conversation.
///
/// The `*Pending` variants mean "outbound channel command issued,
/// awaiting its device-end interrupt".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// No outside proxy welcomed yet.
    Initial,
    /// Our welcome frame is on the wire.
    WelcomePending,
    /// Our ack frame is on the wire.
    IdlePending,
    /// Settled; either side may open a transfer.
    Idle,
    /// Our will-send frame is on the wire.
    TransmitPrepPending,
    /// We asked for the send side, awaiting the peer's ack.
    TransmitPrep,
    /// Our data transmission is on the wire.
    TransmittingPending,
    /// Data sent, awaiting the peer's ack.
    Transmitting,
    /// Our do-send frame is on the wire.
    ReceivingPending,
    /// The peer has the send side; its data frame is expected.
    Receiving,
    /// Our reset frame is on the wire.
    ResetPending,
    /// Resync sent, awaiting the peer's ack.
    Reset,
    /// Takeover in progress; the dial prompt is painted.
    ReconnectCpReadPending,
    /// Takeover accepted; the post-dial banner is on the wire.
    ReconnectDialedPending,
}

impl ProtocolState {
    /// Short name for diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::WelcomePending => "welcome-pending",
            Self::IdlePending => "idle-pending",
            Self::Idle => "idle",
            Self::TransmitPrepPending => "transmit-prep-pending",
            Self::TransmitPrep => "transmit-prep",
            Self::TransmittingPending => "transmitting-pending",
            Self::Transmitting => "transmitting",
            Self::ReceivingPending => "receiving-pending",
            Self::Receiving => "receiving",
            Self::ResetPending => "reset-pending",
            Self::Reset => "reset",
            Self::ReconnectCpReadPending => "reconnect-cp-read-pending",
            Self::ReconnectDialedPending => "reconnect-dialed-pending",
        }
    }
}

/// Request metadata copied out of the substrate interrupt area.
///
/// The payload is deliberately absent: it is read from the substrate only
/// when the transmit frame is about to be built (see [`Action::Transmit`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// VM that issued the send-and-receive call.
    pub origin: VmId,
    /// Substrate message id, opaque to the bridge.
    pub msg_id: u32,
    /// First opaque user word.
    pub user_word1: u32,
    /// Second opaque user word.
    pub user_word2: u32,
    /// Declared payload length.
    pub len: usize,
}

/// Events delivered by the dial channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The outside proxy has a transmission waiting for us.
    Attention,
    /// Our outstanding outbound command has been consumed.
    DeviceEnd,
    /// The armed inbound read completed with these bytes.
    ReadCompleted(Bytes),
    /// A status word carrying neither condition the protocol rides on.
    Stray(ChannelStatus),
}

/// Why a client request is being refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No transmission slot was available.
    SlotsExhausted,
    /// The outside proxy was replaced; the request died with it.
    ProxyReset,
}

impl RejectReason {
    /// Reason code delivered to the client.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::SlotsExhausted => 1,
            Self::ProxyReset => 2,
        }
    }
}

/// Instructions for the runtime, executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write an outbound channel program to the dial channel.
    Issue(Command),
    /// Arm the inbound read for the waiting transmission.
    BeginRead,
    /// Receive the request payload from the substrate, bind it to the
    /// slot with [`Dispatcher::bind_payload`], and write the transmit
    /// frame. This is the only point where a substrate receive may run;
    /// see the module docs of the runtime crate for why.
    Transmit {
        /// Slot dequeued for transmission.
        slot_index: u16,
    },
    /// Deliver a response to the originating client.
    Reply {
        /// Slot being answered.
        slot_index: u16,
        /// Originating VM.
        origin: VmId,
        /// Substrate message id of the original request.
        msg_id: u32,
        /// First user word, as the outside proxy placed it.
        user_word1: u32,
        /// Second user word, as the outside proxy placed it.
        user_word2: u32,
        /// Decoded response payload.
        payload: Bytes,
    },
    /// Return the slot to the free ring via [`Dispatcher::release`] once
    /// its reply has been handed to the substrate.
    Release {
        /// Slot to free.
        slot_index: u16,
    },
    /// Refuse a client request.
    Reject {
        /// Originating VM.
        origin: VmId,
        /// Substrate message id of the refused request.
        msg_id: u32,
        /// Why the request is refused.
        reason: RejectReason,
    },
}

/// The dispatch state machine with its slot table and transition log.
#[derive(Debug)]
pub struct Dispatcher {
    state: ProtocolState,
    encoding: Encoding,
    reading: bool,
    slots: SlotTable,
    log: LogRing,
    last_command: &'static str,
    requests_accepted: u64,
    replies_delivered: u64,
    stray_statuses: u64,
}

impl Dispatcher {
    /// Create a dispatcher in the initial state with an empty slot table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ProtocolState::Initial,
            encoding: Encoding::default(),
            reading: false,
            slots: SlotTable::new(),
            log: LogRing::new(),
            last_command: "none",
            requests_accepted: 0,
            replies_delivered: 0,
            stray_statuses: 0,
        }
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Payload encoding negotiated with the outside proxy.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The slot table, for building transmit frames and for tests.
    #[must_use]
    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// A client send-and-receive request has been signalled.
    ///
    /// Runs in the external-interrupt role: only metadata is copied; the
    /// payload stays with the substrate until [`Action::Transmit`].
    pub fn on_client_request(&mut self, header: RequestHeader) -> Vec<Action> {
        let Some(slot) = self.slots.acquire() else {
            self.log.push("*** out of transmission slots");
            tracing::warn!(
                origin = %header.origin,
                msg_id = header.msg_id,
                "slot table exhausted, rejecting request"
            );
            return vec![Action::Reject {
                origin: header.origin,
                msg_id: header.msg_id,
                reason: RejectReason::SlotsExhausted,
            }];
        };

        slot.load_request(
            header.origin,
            header.msg_id,
            header.user_word1,
            header.user_word2,
            header.len,
        );
        let index = slot.index();
        self.slots.enqueue(index);
        self.requests_accepted += 1;

        // Only an exactly-idle conversation is kicked from here; in any
        // other state the device-interrupt path picks the queue up at its
        // next quiescent point.
        if self.state == ProtocolState::Idle {
            self.enter_transmit_prep()
        } else {
            vec![]
        }
    }

    /// Process one event from the dial channel.
    pub fn on_channel_event(&mut self, event: ChannelEvent) -> Vec<Action> {
        match event {
            ChannelEvent::Attention => {
                self.log.push(" attention ==> inbound read");
                self.reading = true;
                vec![Action::BeginRead]
            },
            ChannelEvent::DeviceEnd => self.on_device_end(),
            ChannelEvent::ReadCompleted(bytes) => {
                self.reading = false;
                self.on_inbound(&bytes)
            },
            ChannelEvent::Stray(status) => {
                self.stray_statuses += 1;
                tracing::debug!(
                    %status,
                    last_command = self.last_command,
                    "stray channel status, ignored"
                );
                vec![]
            },
        }
    }

    /// Bind the payload read from the substrate to its slot, immediately
    /// before the transmit frame is built.
    pub fn bind_payload(&mut self, slot_index: u16, payload: &[u8]) {
        if let Some(slot) = self.slots.lookup_mut(slot_index) {
            slot.bind_payload(payload);
        }
    }

    /// Return a slot whose reply has been handed to the substrate.
    pub fn release(&mut self, slot_index: u16) {
        self.replies_delivered += 1;
        self.slots.release(slot_index);
    }

    /// Ask the outside proxy to dump its own state (STAT handling).
    pub fn request_dump(&mut self) -> Vec<Action> {
        self.log.push(" ==> dump");
        vec![self.issue(Command::Dump)]
    }

    /// Snapshot of the bridge state for the STAT report.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            state: self.state.name(),
            reading: self.reading,
            encoding: self.encoding,
            free: self.slots.free_len(),
            queued: self.slots.queued_len(),
            in_flight: self.slots.in_flight_len(),
            requests_accepted: self.requests_accepted,
            replies_delivered: self.replies_delivered,
            stray_statuses: self.stray_statuses,
            last_command: self.last_command,
            busy: self
                .slots
                .busy_slots()
                .map(|slot| SlotSummary {
                    index: slot.index(),
                    state: slot.state(),
                    origin: slot.origin(),
                    msg_id: slot.msg_id(),
                    user_word1: slot.user_word1(),
                    user_word2: slot.user_word2(),
                })
                .collect(),
            log: self.log.iter().collect(),
        }
    }

    fn issue(&mut self, command: Command) -> Action {
        self.last_command = command.name();
        Action::Issue(command)
    }

    fn enter(&mut self, state: ProtocolState, note: &'static str) {
        self.log.push(note);
        self.state = state;
    }

    fn enter_issue(
        &mut self,
        state: ProtocolState,
        note: &'static str,
        command: Command,
    ) -> Vec<Action> {
        self.enter(state, note);
        vec![self.issue(command)]
    }

    fn enter_reset(&mut self) -> Vec<Action> {
        self.enter_issue(ProtocolState::ResetPending, " -> reset-pending ==> reset", Command::Reset)
    }

    fn enter_idle(&mut self) -> Vec<Action> {
        self.enter_issue(ProtocolState::IdlePending, " -> idle-pending ==> ack", Command::Ack)
    }

    fn enter_receiving(&mut self) -> Vec<Action> {
        self.enter_issue(
            ProtocolState::ReceivingPending,
            " -> receiving-pending ==> do-send",
            Command::DoSend,
        )
    }

    fn enter_transmit_prep(&mut self) -> Vec<Action> {
        self.enter_issue(
            ProtocolState::TransmitPrepPending,
            " -> transmit-prep-pending ==> will-send",
            Command::WillSend,
        )
    }

    fn enter_cp_read(&mut self) -> Vec<Action> {
        self.enter_issue(
            ProtocolState::ReconnectCpReadPending,
            " -> reconnect-cp-read-pending ==> cp-read",
            Command::CpRead,
        )
    }

    /// Device-end with no read outstanding: promote the pending state.
    fn on_device_end(&mut self) -> Vec<Action> {
        match self.state {
            ProtocolState::TransmitPrepPending => {
                self.enter(ProtocolState::TransmitPrep, " device-end -> transmit-prep");
                vec![]
            },
            ProtocolState::ReceivingPending => {
                self.enter(ProtocolState::Receiving, " device-end -> receiving");
                vec![]
            },
            ProtocolState::TransmittingPending => {
                self.enter(ProtocolState::Transmitting, " device-end -> transmitting");
                vec![]
            },
            ProtocolState::IdlePending if self.slots.has_queued() => self.enter_transmit_prep(),
            ProtocolState::IdlePending => {
                self.enter(ProtocolState::Idle, " device-end -> idle");
                vec![]
            },
            ProtocolState::ResetPending => {
                self.enter(ProtocolState::Reset, " device-end -> reset");
                vec![]
            },
            ProtocolState::WelcomePending => self.enter_idle(),
            ProtocolState::ReconnectDialedPending => {
                self.enter(ProtocolState::Initial, " device-end -> initial");
                vec![]
            },
            // completion of a dump or an unsolicited write; nothing rides on it
            _ => vec![],
        }
    }

    fn on_inbound(&mut self, bytes: &[u8]) -> Vec<Action> {
        if bytes.is_empty() {
            self.log.push("*** empty inbound transmission");
            tracing::warn!("inbound read completed with no data");
            return vec![];
        }

        let aid = match classify(bytes) {
            Ok(aid) => aid,
            Err(err) => {
                self.log.push(" <<< unexpected AID");
                tracing::warn!(%err, "unclassifiable inbound transmission, resyncing");
                return self.enter_reset();
            },
        };

        match aid {
            Aid::WantSend => self.on_want_send(),
            Aid::Welcome7of8 | Aid::WelcomeBinary => self.on_welcome(aid),
            Aid::Ack => self.on_ack(bytes),
            Aid::AckWantSend => self.on_ack_want_send(),
            Aid::Clear => {
                self.log.push(" <<< takeover request");
                self.enter_cp_read()
            },
            Aid::Enter if self.state == ProtocolState::ReconnectCpReadPending => {
                self.on_reconnect_input(bytes)
            },
            Aid::DataWantSend | Aid::Enter => self.on_data(bytes, aid == Aid::DataWantSend),
        }
    }

    fn on_want_send(&mut self) -> Vec<Action> {
        self.log.push(" <<< want-send");
        match self.state {
            ProtocolState::Idle => self.enter_receiving(),
            ProtocolState::TransmitPrep => {
                // collision with our own will-send: our side has priority
                self.log.push(" collision: our will-send wins");
                self.enter_transmit_prep()
            },
            _ => self.enter_reset(),
        }
    }

    fn on_welcome(&mut self, aid: Aid) -> Vec<Action> {
        let binary = aid == Aid::WelcomeBinary;
        self.encoding = if binary { Encoding::Binary } else { Encoding::Packed7of8 };
        self.log.push(if binary {
            " <<< welcome (binary transfer)"
        } else {
            " <<< welcome (7-of-8 transfer)"
        });

        if self.state == ProtocolState::Initial {
            if binary {
                self.enter_issue(
                    ProtocolState::WelcomePending,
                    " -> welcome-pending ==> welcome-binary",
                    Command::WelcomeBinary,
                )
            } else {
                self.enter_issue(
                    ProtocolState::WelcomePending,
                    " -> welcome-pending ==> welcome",
                    Command::Welcome,
                )
            }
        } else {
            self.log.push("*** unexpected welcome, resyncing");
            tracing::warn!(state = self.state.name(), "welcome outside the initial state");
            self.enter_reset()
        }
    }

    fn on_ack(&mut self, bytes: &[u8]) -> Vec<Action> {
        self.log.push(" <<< ack");
        match self.state {
            ProtocolState::TransmitPrep => match self.slots.dequeue() {
                Some(slot_index) => {
                    self.enter(
                        ProtocolState::TransmittingPending,
                        " -> transmitting-pending ==> xmit",
                    );
                    self.last_command = "xmit-packet";
                    vec![Action::Transmit { slot_index }]
                },
                None => {
                    tracing::warn!("send side granted with nothing queued, resyncing");
                    self.enter_reset()
                },
            },
            ProtocolState::Transmitting | ProtocolState::Reset => {
                if self.slots.has_queued() {
                    self.enter_transmit_prep()
                } else if has_want_send_suffix(bytes) {
                    // want-send rode in on the ack confirming our data frame
                    self.log.push(" <<< want-send suffix on ack");
                    self.enter_receiving()
                } else {
                    self.enter(ProtocolState::Idle, " -> idle");
                    vec![]
                }
            },
            // a stray ack; if the peer is confused it will resync itself
            _ => vec![],
        }
    }

    fn on_ack_want_send(&mut self) -> Vec<Action> {
        self.log.push(" <<< ack + want-send");
        match self.state {
            ProtocolState::Transmitting | ProtocolState::Reset => self.enter_receiving(),
            _ => self.enter_reset(),
        }
    }

    fn on_reconnect_input(&mut self, bytes: &[u8]) -> Vec<Action> {
        if dial_command_follows(bytes) {
            // A new outside proxy has dialed in. The previous proxy's
            // state died with it, so every pending request is now
            // unanswerable and must be rejected before the table restarts.
            self.log.push(" <<< DIAL: resetting all requests");
            let rejected = self.slots.reset_all();
            tracing::info!(rejected = rejected.len(), "outside proxy replaced, table reset");

            let mut actions: Vec<Action> = rejected
                .into_iter()
                .map(|(origin, msg_id)| Action::Reject {
                    origin,
                    msg_id,
                    reason: RejectReason::ProxyReset,
                })
                .collect();
            actions.extend(self.enter_issue(
                ProtocolState::ReconnectDialedPending,
                " -> reconnect-dialed-pending ==> dialed",
                Command::Dialed,
            ));
            actions
        } else {
            // some other console input; paint the prompt again
            self.enter_cp_read()
        }
    }

    fn on_data(&mut self, bytes: &[u8], keep_receiving: bool) -> Vec<Action> {
        if bytes.len() < MIN_DATA_LEN {
            self.log.push("*** response shorter than header");
            tracing::warn!(len = bytes.len(), "data transmission too short, resyncing");
            return self.enter_reset();
        }

        if !matches!(self.state, ProtocolState::Receiving | ProtocolState::ReceivingPending) {
            self.log.push("*** data frame outside receive dialogue");
            tracing::warn!(state = self.state.name(), "data frame in the wrong state, resyncing");
            return self.enter_reset();
        }

        self.log.push(if keep_receiving { " <<< data + want-send" } else { " <<< data" });

        let response = match Response::parse(bytes, self.encoding) {
            Ok(response) => response,
            Err(err) => {
                self.log.push("*** undecodable data frame");
                tracing::warn!(%err, "data frame failed to parse, resyncing");
                return self.enter_reset();
            },
        };

        self.deliver(response, keep_receiving)
    }

    fn deliver(&mut self, response: Response, keep_receiving: bool) -> Vec<Action> {
        let mut actions = Vec::new();

        match self.slots.lookup_mut(response.slot_index) {
            None => {
                self.log.push("*** invalid slot from outside proxy");
                tracing::warn!(slot = response.slot_index, "response slot out of range, resyncing");
                return self.enter_reset();
            },
            Some(slot) if slot.state() == SlotState::InFlight => {
                if response.truncated {
                    tracing::warn!(
                        slot = response.slot_index,
                        received = response.payload.len(),
                        "declared response length exceeded the bytes received, clamped"
                    );
                }
                slot.begin_return();
                actions.push(Action::Reply {
                    slot_index: slot.index(),
                    origin: slot.origin(),
                    msg_id: slot.msg_id(),
                    user_word1: response.user_word1,
                    user_word2: response.user_word2,
                    payload: response.payload,
                });
                actions.push(Action::Release { slot_index: response.slot_index });
            },
            // a response to a request that was reset; accept silently
            Some(_) => {
                self.log.push(" <<< response for an unused slot, dropped");
            },
        }

        actions.extend(if keep_receiving { self.enter_receiving() } else { self.enter_idle() });
        actions
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(name: &str) -> VmId {
        VmId::from_name(name).unwrap()
    }

    fn header(name: &str, msg_id: u32) -> RequestHeader {
        RequestHeader { origin: origin(name), msg_id, user_word1: 0, user_word2: 0, len: 0 }
    }

    fn inbound(dispatcher: &mut Dispatcher, bytes: &[u8]) -> Vec<Action> {
        dispatcher.on_channel_event(ChannelEvent::ReadCompleted(Bytes::copy_from_slice(bytes)))
    }

    #[test]
    fn welcome_handshake_reaches_idle() {
        let mut d = Dispatcher::new();

        let actions = inbound(&mut d, &[0xF2]);
        assert_eq!(actions, vec![Action::Issue(Command::Welcome)]);
        assert_eq!(d.state(), ProtocolState::WelcomePending);
        assert_eq!(d.encoding(), Encoding::Packed7of8);

        let actions = d.on_channel_event(ChannelEvent::DeviceEnd);
        assert_eq!(actions, vec![Action::Issue(Command::Ack)]);
        assert_eq!(d.state(), ProtocolState::IdlePending);

        assert!(d.on_channel_event(ChannelEvent::DeviceEnd).is_empty());
        assert_eq!(d.state(), ProtocolState::Idle);
    }

    #[test]
    fn binary_welcome_selects_binary_encoding() {
        let mut d = Dispatcher::new();
        let actions = inbound(&mut d, &[0xF9]);
        assert_eq!(actions, vec![Action::Issue(Command::WelcomeBinary)]);
        assert_eq!(d.encoding(), Encoding::Binary);
    }

    #[test]
    fn welcome_outside_initial_resyncs() {
        let mut d = idle_dispatcher();
        let actions = inbound(&mut d, &[0xF2]);
        assert_eq!(actions, vec![Action::Issue(Command::Reset)]);
        assert_eq!(d.state(), ProtocolState::ResetPending);
    }

    fn idle_dispatcher() -> Dispatcher {
        let mut d = Dispatcher::new();
        let _ = inbound(&mut d, &[0xF2]);
        let _ = d.on_channel_event(ChannelEvent::DeviceEnd);
        let _ = d.on_channel_event(ChannelEvent::DeviceEnd);
        assert_eq!(d.state(), ProtocolState::Idle);
        d
    }

    #[test]
    fn request_from_idle_opens_transmit_dialogue() {
        let mut d = idle_dispatcher();
        let actions = d.on_client_request(header("CLIENTA", 7));
        assert_eq!(actions, vec![Action::Issue(Command::WillSend)]);
        assert_eq!(d.state(), ProtocolState::TransmitPrepPending);
        assert_eq!(d.slots().queued_len(), 1);
    }

    #[test]
    fn request_outside_idle_only_queues() {
        let mut d = Dispatcher::new();
        let actions = d.on_client_request(header("CLIENTA", 7));
        assert!(actions.is_empty());
        assert_eq!(d.state(), ProtocolState::Initial);
        assert_eq!(d.slots().queued_len(), 1);
    }

    #[test]
    fn ack_in_transmit_prep_dequeues_for_transmission() {
        let mut d = idle_dispatcher();
        let _ = d.on_client_request(header("CLIENTA", 7));
        let _ = d.on_channel_event(ChannelEvent::DeviceEnd);
        assert_eq!(d.state(), ProtocolState::TransmitPrep);

        let actions = inbound(&mut d, &[0xF1]);
        assert_eq!(actions, vec![Action::Transmit { slot_index: 0 }]);
        assert_eq!(d.state(), ProtocolState::TransmittingPending);
    }

    #[test]
    fn stray_ack_is_ignored() {
        let mut d = idle_dispatcher();
        let actions = inbound(&mut d, &[0xF1]);
        assert!(actions.is_empty());
        assert_eq!(d.state(), ProtocolState::Idle);
    }

    #[test]
    fn attention_arms_the_read() {
        let mut d = idle_dispatcher();
        let actions = d.on_channel_event(ChannelEvent::Attention);
        assert_eq!(actions, vec![Action::BeginRead]);
    }

    #[test]
    fn stray_status_counts_without_state_change() {
        let mut d = idle_dispatcher();
        let actions = d
            .on_channel_event(ChannelEvent::Stray(ChannelStatus::from_bits(0x8000_0000)));
        assert!(actions.is_empty());
        assert_eq!(d.state(), ProtocolState::Idle);
        assert_eq!(d.diagnostics().stray_statuses, 1);
    }

    #[test]
    fn empty_read_is_ignored() {
        let mut d = idle_dispatcher();
        let actions = inbound(&mut d, &[]);
        assert!(actions.is_empty());
        assert_eq!(d.state(), ProtocolState::Idle);
    }

    #[test]
    fn unknown_aid_resyncs() {
        let mut d = idle_dispatcher();
        let actions = inbound(&mut d, &[0x42, 0, 0]);
        assert_eq!(actions, vec![Action::Issue(Command::Reset)]);
    }
}
