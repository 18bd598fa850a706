//! Property tests for the slot table: under any interleaving of admits,
//! transmissions, completions, and resets, every slot stays in exactly
//! one population and the populations sum to the table capacity.

use hostlink_core::{SLOT_COUNT, SlotState, SlotTable, VmId};
use proptest::prelude::*;

/// One step the bridge can take against the table.
#[derive(Debug, Clone, Copy)]
enum Op {
    /// Acquire a slot and enqueue it (a client request arriving).
    Admit,
    /// Dequeue the next slot and bind its payload (a transmission).
    Transmit,
    /// Release the oldest in-flight slot (a response round trip).
    Complete,
    /// Reject everything and reinitialize (a proxy takeover).
    ResetAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => Just(Op::Admit),
        6 => Just(Op::Transmit),
        5 => Just(Op::Complete),
        1 => Just(Op::ResetAll),
    ]
}

fn check_conservation(table: &SlotTable) {
    assert_eq!(table.free_len() + table.queued_len() + table.in_flight_len(), SLOT_COUNT);
}

proptest! {
    #[test]
    fn populations_are_conserved(ops in prop::collection::vec(op_strategy(), 1..400)) {
        let origin = VmId::from_name("CLIENTA").unwrap();
        let mut table = SlotTable::new();
        let mut next_msg_id = 1u32;
        let mut busy_count = 0usize;

        for op in ops {
            match op {
                Op::Admit => {
                    if let Some(slot) = table.acquire() {
                        slot.load_request(origin, next_msg_id, 0, 0, 16);
                        next_msg_id += 1;
                        let index = slot.index();
                        table.enqueue(index);
                        busy_count += 1;
                    } else {
                        // exhaustion only at full occupancy
                        prop_assert_eq!(busy_count, SLOT_COUNT);
                    }
                },
                Op::Transmit => {
                    if let Some(index) = table.dequeue() {
                        table.lookup_mut(index).unwrap().bind_payload(b"payload");
                    }
                },
                Op::Complete => {
                    let in_flight = table
                        .busy_slots()
                        .find(|slot| slot.state() == SlotState::InFlight)
                        .map(|slot| slot.index());
                    if let Some(index) = in_flight {
                        table.release(index);
                        busy_count -= 1;
                    }
                },
                Op::ResetAll => {
                    let rejected = table.reset_all();
                    prop_assert_eq!(rejected.len(), busy_count);
                    busy_count = 0;
                },
            }
            check_conservation(&table);
            prop_assert_eq!(table.busy_slots().count(), busy_count);
        }
    }
}
