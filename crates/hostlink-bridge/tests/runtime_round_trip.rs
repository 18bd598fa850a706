//! Runtime tests over the in-memory ports: the test plays both the
//! outside proxy (through the dial driver) and the client VMs (through
//! the substrate handle).

use std::time::Duration;

use bytes::Bytes;
use hostlink_bridge::{
    BridgeError, ClientOutcome, MemoryDial, MemoryDialDriver, MemoryVmcf, MemoryVmcfHandle,
    Runtime,
};
use hostlink_core::{RejectReason, SLOT_COUNT, VmId};
use hostlink_proto::{Encoding, XmitHeader, pack_7of8, wcc};
use tokio::{sync::oneshot, task::JoinHandle, time::timeout};

fn origin(name: &str) -> VmId {
    VmId::from_name(name).unwrap()
}

fn spawn_bridge() -> (MemoryDialDriver, MemoryVmcfHandle, JoinHandle<Result<(), BridgeError>>) {
    let (vmcf, handle, substrate) = MemoryVmcf::new();
    let (dial, driver, channel) = MemoryDial::new();
    let task = tokio::spawn(Runtime::new(vmcf, dial, substrate, channel).run());
    (driver, handle, task)
}

async fn next_frame(driver: &mut MemoryDialDriver) -> Bytes {
    timeout(Duration::from_secs(5), driver.next_written())
        .await
        .expect("timed out waiting for an outbound frame")
        .expect("dial channel closed")
}

async fn resolve(outcome: oneshot::Receiver<ClientOutcome>) -> ClientOutcome {
    timeout(Duration::from_secs(5), outcome)
        .await
        .expect("timed out waiting for the client outcome")
        .expect("bridge dropped the request")
}

/// Welcome the bridge and settle it in the idle state.
async fn welcome(driver: &mut MemoryDialDriver, aid: u8) {
    driver.send(vec![aid]);
    let frame = next_frame(driver).await;
    assert!(frame[0] == wcc::WELCOME || frame[0] == wcc::WELCOME_BINARY);
    let ack = next_frame(driver).await;
    assert_eq!(ack[0], wcc::ACK);
}

/// Assemble a data transmission the way the outside proxy frames one.
fn data_frame(
    aid: u8,
    slot: u16,
    uw1: u32,
    uw2: u32,
    payload: &[u8],
    encoding: Encoding,
) -> Vec<u8> {
    let mut region = Vec::new();
    region.extend_from_slice(&slot.to_be_bytes());
    region.extend_from_slice(&uw1.to_be_bytes());
    region.extend_from_slice(&uw2.to_be_bytes());
    region.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    region.extend_from_slice(payload);

    let mut wire = vec![aid];
    wire.extend_from_slice(&[0u8; 10]);
    match encoding {
        Encoding::Binary => wire.extend_from_slice(&region),
        Encoding::Packed7of8 => wire.extend_from_slice(&pack_7of8(&region)),
    }
    wire
}

#[tokio::test]
async fn round_trip_over_memory_ports() {
    let (mut driver, handle, _task) = spawn_bridge();
    welcome(&mut driver, 0xF2).await;

    let outcome = handle.send_and_receive(origin("CLIENTA"), 7, 1, 2, &b"hello"[..]);

    // the bridge asks for the send side
    let frame = next_frame(&mut driver).await;
    assert_eq!(frame[0], wcc::WILL_SEND);

    // grant it and inspect the transmission
    driver.send(vec![0xF1]);
    let xmit = next_frame(&mut driver).await;
    let header = XmitHeader::from_bytes(&xmit).unwrap();
    assert_eq!(header.origin(), b"CLIENTA ");
    assert_eq!(header.user_word1(), 1);
    assert_eq!(header.user_word2(), 2);
    assert_eq!(header.slot_index(), 0);
    assert_eq!(&xmit[XmitHeader::SIZE..], b"hello");

    // confirm the data; the want-send suffix announces our response
    driver.send(vec![0xF1, 0, 0, 0xF5]);
    let frame = next_frame(&mut driver).await;
    assert_eq!(frame[0], wcc::DO_SEND);

    driver.send(data_frame(0x7D, 0, 0x1111_1111, 0x2222_2222, b"world", Encoding::Packed7of8));
    let ack = next_frame(&mut driver).await;
    assert_eq!(ack[0], wcc::ACK);

    assert_eq!(
        resolve(outcome).await,
        ClientOutcome::Reply {
            user_word1: 0x1111_1111,
            user_word2: 0x2222_2222,
            payload: Bytes::from_static(b"world"),
        }
    );
}

#[tokio::test]
async fn empty_request_sends_header_only() {
    let (mut driver, handle, _task) = spawn_bridge();
    welcome(&mut driver, 0xF2).await;

    let _outcome = handle.send_and_receive(origin("CLIENTA"), 3, 0, 0, &b""[..]);
    assert_eq!(next_frame(&mut driver).await[0], wcc::WILL_SEND);

    driver.send(vec![0xF1]);
    let xmit = next_frame(&mut driver).await;
    assert_eq!(xmit.len(), XmitHeader::SIZE);
}

#[tokio::test]
async fn takeover_rejects_the_in_flight_request() {
    let (mut driver, handle, _task) = spawn_bridge();
    welcome(&mut driver, 0xF2).await;

    let outcome = handle.send_and_receive(origin("CLIENTA"), 100, 0, 0, &b"req"[..]);
    assert_eq!(next_frame(&mut driver).await[0], wcc::WILL_SEND);
    driver.send(vec![0xF1]);
    let _xmit = next_frame(&mut driver).await;
    // plain ack: the request is now in flight and the line is idle
    driver.send(vec![0xF1]);

    // another outside proxy takes the line over
    driver.send(vec![0x6D]);
    let prompt = next_frame(&mut driver).await;
    assert_eq!(prompt[0], 0xC2);

    let mut input = vec![0x7Du8, 0, 0, 0, 0, 0];
    input.extend_from_slice(b"DIAL HOSTLINK");
    driver.send(input);

    assert_eq!(
        resolve(outcome).await,
        ClientOutcome::Reject { reason: RejectReason::ProxyReset }
    );

    let banner = next_frame(&mut driver).await;
    assert_eq!(&banner[..], b"\xc2\x11  DIALED TO me");

    // the fresh proxy is welcomed from scratch
    driver.send(vec![0xF9]);
    assert_eq!(next_frame(&mut driver).await[0], wcc::WELCOME_BINARY);
}

#[tokio::test]
async fn slot_exhaustion_rejects_the_overflow_request() {
    let (_driver, handle, _task) = spawn_bridge();

    // fill every slot while nothing is connected: requests just queue
    let mut outcomes = Vec::new();
    for i in 0..SLOT_COUNT as u32 {
        outcomes.push(handle.send_and_receive(origin("CLIENTA"), i + 1, 0, 0, &b"x"[..]));
    }

    let overflow = handle.send_and_receive(origin("CLIENTB"), 9999, 0, 0, &b"x"[..]);
    assert_eq!(
        resolve(overflow).await,
        ClientOutcome::Reject { reason: RejectReason::SlotsExhausted }
    );
}

#[tokio::test]
async fn stat_emits_dump_and_only_privileged_end_shuts_down() {
    let (mut driver, handle, task) = spawn_bridge();
    welcome(&mut driver, 0xF2).await;

    handle.send_control(origin("CLIENTA"), "STAT");
    assert_eq!(next_frame(&mut driver).await[0], wcc::DUMP);

    // END from an unprivileged origin is ignored; the bridge keeps serving
    handle.send_control(origin("CLIENTA"), "END");
    driver.send(vec![0xF5]);
    assert_eq!(next_frame(&mut driver).await[0], wcc::DO_SEND);

    handle.send_control(VmId::MAINT, "END");
    let result = timeout(Duration::from_secs(5), task)
        .await
        .expect("bridge did not shut down")
        .expect("bridge task panicked");
    assert!(result.is_ok());
}
