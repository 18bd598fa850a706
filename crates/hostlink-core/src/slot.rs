//! Request slots and the fixed-capacity table that tracks them.
//!
//! Every client request occupies one slot from creation to reply. The
//! table is sized at compile time; the slot index is the stable identity
//! that travels on the wire, so a slot's position never changes. Free
//! slots and slots awaiting transmission each live in a fixed index ring,
//! which keeps the steady state allocation-free.
//!
//! A slot is in exactly one of four states and in at most one ring:
//! free slots sit in the free ring, enqueued slots in the transmit queue,
//! and in-flight / returning slots in neither.

use hostlink_proto::MAX_PACKET_LEN;

/// Number of request slots. A compile-time constant, not a protocol
/// parameter: the wire carries the full 16-bit slot index.
pub const SLOT_COUNT: usize = 128;

/// Origin VM identifier: eight characters, space-padded.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VmId([u8; 8]);

impl VmId {
    /// The privileged origin allowed to shut the bridge down.
    pub const MAINT: Self = Self(*b"MAINT   ");

    /// Wrap raw identifier bytes.
    #[must_use]
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Build an identifier from a name of up to eight ASCII characters,
    /// space-padding on the right. `None` if the name does not fit.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() || name.len() > 8 || !name.is_ascii() {
            return None;
        }
        let mut bytes = [b' '; 8];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Some(Self(bytes))
    }

    /// Raw identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl std::fmt::Display for VmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0).trim_end())
    }
}

impl std::fmt::Debug for VmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VmId({self})")
    }
}

/// Lifecycle state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// In the free ring, carrying no request.
    Free,
    /// Metadata received from a client, waiting in the transmit queue.
    Enqueued,
    /// Transmitted to the outside proxy, awaiting its response.
    InFlight,
    /// Response received; reply to the client in progress.
    Returning,
}

/// One request from reception through to the reply.
#[derive(Debug, Clone)]
pub struct Slot {
    index: u16,
    state: SlotState,
    origin: VmId,
    msg_id: u32,
    user_word1: u32,
    user_word2: u32,
    request_len: usize,
    payload: Vec<u8>,
}

impl Slot {
    fn new(index: u16) -> Self {
        Self {
            index,
            state: SlotState::Free,
            origin: VmId::new([b' '; 8]),
            msg_id: 0,
            user_word1: 0,
            user_word2: 0,
            request_len: 0,
            payload: Vec::new(),
        }
    }

    /// Stable position in the table; travels on the wire.
    #[must_use]
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Origin VM of the request this slot carries.
    #[must_use]
    pub fn origin(&self) -> VmId {
        self.origin
    }

    /// Substrate message id; opaque to the bridge.
    #[must_use]
    pub fn msg_id(&self) -> u32 {
        self.msg_id
    }

    /// First opaque user word.
    #[must_use]
    pub fn user_word1(&self) -> u32 {
        self.user_word1
    }

    /// Second opaque user word.
    #[must_use]
    pub fn user_word2(&self) -> u32 {
        self.user_word2
    }

    /// Declared request payload length, clamped to the packet maximum.
    #[must_use]
    pub fn request_len(&self) -> usize {
        self.request_len
    }

    /// Request payload; empty until bound at transmit time.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Copy request metadata out of the substrate interrupt area.
    ///
    /// The payload itself is deliberately not read here; it is bound in
    /// the device-interrupt context just before transmission.
    pub fn load_request(&mut self, origin: VmId, msg_id: u32, uw1: u32, uw2: u32, len: usize) {
        debug_assert_eq!(self.state, SlotState::Enqueued);
        self.origin = origin;
        self.msg_id = msg_id;
        self.user_word1 = uw1;
        self.user_word2 = uw2;
        self.request_len = len.min(MAX_PACKET_LEN);
        self.payload.clear();
    }

    /// Bind the request payload read from the substrate; the slot is now
    /// in flight.
    pub fn bind_payload(&mut self, payload: &[u8]) {
        debug_assert_eq!(self.state, SlotState::Enqueued);
        self.payload.clear();
        self.payload.extend_from_slice(&payload[..payload.len().min(MAX_PACKET_LEN)]);
        self.state = SlotState::InFlight;
    }

    /// Mark the response received; the reply is being handed back.
    pub fn begin_return(&mut self) {
        debug_assert_eq!(self.state, SlotState::InFlight);
        self.state = SlotState::Returning;
    }
}

/// Fixed-capacity ring of slot indices.
///
/// One spare cell distinguishes full from empty, so the ring holds all
/// `SLOT_COUNT` indices at once.
#[derive(Debug, Clone)]
struct IndexRing {
    cells: [u16; SLOT_COUNT + 1],
    head: usize,
    tail: usize,
}

impl IndexRing {
    fn empty() -> Self {
        Self { cells: [0; SLOT_COUNT + 1], head: 0, tail: 0 }
    }

    fn push(&mut self, index: u16) {
        let next = (self.tail + 1) % self.cells.len();
        debug_assert_ne!(next, self.head, "index ring overflow");
        self.cells[self.tail] = index;
        self.tail = next;
    }

    fn pop(&mut self) -> Option<u16> {
        if self.head == self.tail {
            return None;
        }
        let index = self.cells[self.head];
        self.head = (self.head + 1) % self.cells.len();
        Some(index)
    }

    fn len(&self) -> usize {
        (self.tail + self.cells.len() - self.head) % self.cells.len()
    }

    fn is_empty(&self) -> bool {
        self.head == self.tail
    }
}

/// The fixed pool of request slots with its free ring and transmit queue.
#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: Vec<Slot>,
    free: IndexRing,
    queue: IndexRing,
}

impl SlotTable {
    /// Create a table with every slot free.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            slots: (0..SLOT_COUNT).map(|i| Slot::new(i as u16)).collect(),
            free: IndexRing::empty(),
            queue: IndexRing::empty(),
        };
        for i in 0..SLOT_COUNT {
            table.free.push(i as u16);
        }
        table
    }

    /// Take the next slot from the free ring. `None` when exhausted; the
    /// caller must then reject the client request.
    pub fn acquire(&mut self) -> Option<&mut Slot> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[usize::from(index)];
        debug_assert_eq!(slot.state, SlotState::Free);
        slot.state = SlotState::Enqueued;
        Some(slot)
    }

    /// Append a slot to the transmit queue.
    pub fn enqueue(&mut self, index: u16) {
        debug_assert_eq!(self.slots[usize::from(index)].state, SlotState::Enqueued);
        self.queue.push(index);
    }

    /// Pop the next slot to transmit, FIFO. `None` when the queue is empty.
    pub fn dequeue(&mut self) -> Option<u16> {
        self.queue.pop()
    }

    /// Is at least one request waiting to be transmitted?
    #[must_use]
    pub fn has_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Return a slot to the free ring.
    pub fn release(&mut self, index: u16) {
        let slot = &mut self.slots[usize::from(index)];
        debug_assert_ne!(slot.state, SlotState::Free, "double release of slot {index}");
        slot.state = SlotState::Free;
        slot.msg_id = 0;
        slot.payload.clear();
        self.free.push(index);
    }

    /// Look up a slot by its stable index. `None` if out of range.
    #[must_use]
    pub fn lookup(&self, index: u16) -> Option<&Slot> {
        self.slots.get(usize::from(index))
    }

    /// Mutable lookup by stable index. `None` if out of range.
    pub fn lookup_mut(&mut self, index: u16) -> Option<&mut Slot> {
        self.slots.get_mut(usize::from(index))
    }

    /// Drain every busy slot for a reject and reinitialize the table.
    ///
    /// Returns the (origin, message id) of each slot that was not free, in
    /// index order. Used when a fresh outside proxy takes over and all
    /// in-flight state becomes meaningless.
    pub fn reset_all(&mut self) -> Vec<(VmId, u32)> {
        let rejected: Vec<_> = self
            .slots
            .iter()
            .filter(|slot| slot.state != SlotState::Free)
            .map(|slot| (slot.origin, slot.msg_id))
            .collect();
        *self = Self::new();
        rejected
    }

    /// Number of slots in the free ring.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Number of slots waiting in the transmit queue.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of slots transmitted and awaiting a response (or returning).
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.state, SlotState::InFlight | SlotState::Returning))
            .count()
    }

    /// All slots currently carrying a request, in index order.
    pub fn busy_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.state != SlotState::Free)
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}
