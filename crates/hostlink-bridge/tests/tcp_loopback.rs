//! End-to-end test over the TCP stand-in for the dialed device: a real
//! socket pair, length-prefixed transmissions, and a full request round
//! trip in binary mode.

use std::time::Duration;

use hostlink_bridge::{ClientOutcome, MemoryVmcf, Runtime, TcpDialServer};
use hostlink_core::VmId;
use hostlink_proto::{XmitHeader, wcc};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

async fn write_transmission(proxy: &mut TcpStream, bytes: &[u8]) {
    proxy.write_all(&(bytes.len() as u16).to_be_bytes()).await.unwrap();
    proxy.write_all(bytes).await.unwrap();
    proxy.flush().await.unwrap();
}

async fn read_transmission(proxy: &mut TcpStream) -> Vec<u8> {
    timeout(Duration::from_secs(5), async {
        let mut len_buf = [0u8; 2];
        proxy.read_exact(&mut len_buf).await.unwrap();
        let mut buf = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
        proxy.read_exact(&mut buf).await.unwrap();
        buf
    })
    .await
    .expect("timed out waiting for an outbound frame")
}

/// Binary-mode data transmission as the outside proxy frames one.
fn data_frame(slot: u16, uw1: u32, uw2: u32, payload: &[u8]) -> Vec<u8> {
    let mut wire = vec![0x7Du8];
    wire.extend_from_slice(&[0u8; 10]);
    wire.extend_from_slice(&slot.to_be_bytes());
    wire.extend_from_slice(&uw1.to_be_bytes());
    wire.extend_from_slice(&uw2.to_be_bytes());
    wire.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    wire.extend_from_slice(payload);
    wire
}

#[tokio::test]
async fn binary_round_trip_over_tcp() {
    let (dial, dial_signals) = TcpDialServer::bind("127.0.0.1:0").await.unwrap();
    let addr = dial.local_addr();

    let (vmcf, handle, substrate_signals) = MemoryVmcf::new();
    let task = tokio::spawn(Runtime::new(vmcf, dial, substrate_signals, dial_signals).run());

    // the outside proxy dials in and welcomes us in binary mode
    let mut proxy = TcpStream::connect(addr).await.unwrap();
    write_transmission(&mut proxy, &[0xF9]).await;
    assert_eq!(read_transmission(&mut proxy).await[0], wcc::WELCOME_BINARY);
    assert_eq!(read_transmission(&mut proxy).await[0], wcc::ACK);

    // a client request opens the transmit dialogue
    let origin = VmId::from_name("CLIENTA").unwrap();
    let outcome = handle.send_and_receive(origin, 1, 7, 8, &b"ping"[..]);
    assert_eq!(read_transmission(&mut proxy).await[0], wcc::WILL_SEND);

    write_transmission(&mut proxy, &[0xF1]).await;
    let xmit = read_transmission(&mut proxy).await;
    let header = XmitHeader::from_bytes(&xmit).unwrap();
    assert_eq!(header.origin(), b"CLIENTA ");
    assert_eq!(header.user_word1(), 7);
    assert_eq!(header.user_word2(), 8);
    assert_eq!(header.slot_index(), 0);
    assert_eq!(&xmit[XmitHeader::SIZE..], b"ping");

    // ack with the want-send suffix, then answer in the clear
    write_transmission(&mut proxy, &[0xF1, 0, 0, 0xF5]).await;
    assert_eq!(read_transmission(&mut proxy).await[0], wcc::DO_SEND);

    write_transmission(&mut proxy, &data_frame(0, 0xAA, 0xBB, b"pong")).await;
    assert_eq!(read_transmission(&mut proxy).await[0], wcc::ACK);

    let outcome = timeout(Duration::from_secs(5), outcome)
        .await
        .expect("timed out waiting for the reply")
        .expect("bridge dropped the request");
    let ClientOutcome::Reply { user_word1, user_word2, payload } = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(user_word1, 0xAA);
    assert_eq!(user_word2, 0xBB);
    assert_eq!(&payload[..], b"pong");

    // the privileged END stops the bridge cleanly
    handle.send_control(VmId::MAINT, "END");
    let result = timeout(Duration::from_secs(5), task)
        .await
        .expect("bridge did not shut down")
        .expect("bridge task panicked");
    assert!(result.is_ok());
}
