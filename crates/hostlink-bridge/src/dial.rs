//! The device half of channel I/O: the dialed display channel.
//!
//! The bridge drives the channel through the [`DialPort`] trait (write a
//! channel program, arm the inbound read) and observes it through
//! [`DialSignal`]s on the runtime queue: attention when the outside proxy
//! has a transmission waiting, device-end when an outbound write has been
//! consumed, and the read completion carrying the transmission bytes.
//!
//! [`TcpDialServer`] stands in for the real dialed device: the outside
//! proxy "dials in" by connecting to a listening socket, and each
//! direction frames transmissions with a u16 big-endian length prefix.
//! [`MemoryDial`] is the deterministic in-memory port the tests script.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use hostlink_proto::{ChannelStatus, RECV_BUFFER_LEN};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};

/// Events the dial channel raises toward the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialSignal {
    /// The outside proxy has a transmission waiting.
    Attention,
    /// Our outstanding outbound write has been consumed.
    DeviceEnd,
    /// The armed inbound read completed with these bytes.
    ReadCompleted(Bytes),
    /// A status carrying neither condition the protocol rides on.
    Stray(ChannelStatus),
}

/// The operations the bridge performs against the dial channel.
pub trait DialPort {
    /// Write an outbound channel program. Completion is signalled by a
    /// device-end; a failed write is retried once, then logged and
    /// dropped, leaving the peer to resynchronize through its own reset.
    fn issue(&mut self, program: Bytes);

    /// Arm the inbound read for the oldest waiting transmission.
    fn begin_read(&mut self);
}

// ---------------------------------------------------------------------
// In-memory port for deterministic tests
// ---------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryDialState {
    pending: VecDeque<Bytes>,
    armed: bool,
}

/// Scripted in-memory dial channel.
pub struct MemoryDial {
    state: Arc<Mutex<MemoryDialState>>,
    signals: mpsc::UnboundedSender<DialSignal>,
    written: mpsc::UnboundedSender<Bytes>,
}

/// Test-side driver of a [`MemoryDial`]: plays the outside proxy.
pub struct MemoryDialDriver {
    state: Arc<Mutex<MemoryDialState>>,
    signals: mpsc::UnboundedSender<DialSignal>,
    written: mpsc::UnboundedReceiver<Bytes>,
}

impl MemoryDial {
    /// Create the port, its driver, and the signal stream the runtime
    /// listens on.
    #[must_use]
    pub fn new() -> (Self, MemoryDialDriver, mpsc::UnboundedReceiver<DialSignal>) {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (written_tx, written_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(MemoryDialState::default()));
        let port = Self {
            state: Arc::clone(&state),
            signals: signals_tx.clone(),
            written: written_tx,
        };
        let driver = MemoryDialDriver { state, signals: signals_tx, written: written_rx };
        (port, driver, signals_rx)
    }
}

impl DialPort for MemoryDial {
    fn issue(&mut self, program: Bytes) {
        let _ = self.written.send(program);
        let _ = self.signals.send(DialSignal::DeviceEnd);
    }

    fn begin_read(&mut self) {
        let mut state = self.state.lock().expect("dial lock poisoned");
        if let Some(frame) = state.pending.pop_front() {
            let _ = self.signals.send(DialSignal::ReadCompleted(frame));
        } else {
            state.armed = true;
        }
    }
}

impl MemoryDialDriver {
    /// Deliver a transmission from the outside proxy to the bridge.
    pub fn send(&self, frame: impl Into<Bytes>) {
        let frame = frame.into();
        let mut state = self.state.lock().expect("dial lock poisoned");
        if state.armed {
            state.armed = false;
            let _ = self.signals.send(DialSignal::ReadCompleted(frame));
        } else {
            state.pending.push_back(frame);
            let _ = self.signals.send(DialSignal::Attention);
        }
    }

    /// Raise a status word that carries no protocol condition.
    pub fn send_stray(&self, status: ChannelStatus) {
        let _ = self.signals.send(DialSignal::Stray(status));
    }

    /// Next frame the bridge wrote, in write order.
    pub async fn next_written(&mut self) -> Option<Bytes> {
        self.written.recv().await
    }
}

// ---------------------------------------------------------------------
// TCP stand-in for the dialed device
// ---------------------------------------------------------------------

/// Dial channel served over a listening TCP socket.
///
/// One outside proxy is connected at a time; when it disconnects the
/// listener waits for the next dial-in. Unread transmissions die with
/// their connection, as they would with a redialed terminal.
pub struct TcpDialServer {
    writes: mpsc::UnboundedSender<Bytes>,
    grants: mpsc::UnboundedSender<()>,
    local_addr: std::net::SocketAddr,
}

impl TcpDialServer {
    /// Bind the listener and return the port plus the signal stream.
    pub async fn bind(
        addr: &str,
    ) -> std::io::Result<(Self, mpsc::UnboundedReceiver<DialSignal>)> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();
        let (grants_tx, grants_rx) = mpsc::unbounded_channel();

        tokio::spawn(accept_loop(listener, writes_rx, grants_rx, signals_tx));

        Ok((Self { writes: writes_tx, grants: grants_tx, local_addr }, signals_rx))
    }

    /// Address the outside proxy dials in to.
    #[must_use]
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }
}

impl DialPort for TcpDialServer {
    fn issue(&mut self, program: Bytes) {
        if self.writes.send(program).is_err() {
            tracing::warn!("dial channel is gone, outbound frame dropped");
        }
    }

    fn begin_read(&mut self) {
        if self.grants.send(()).is_err() {
            tracing::warn!("dial channel is gone, read not armed");
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut writes: mpsc::UnboundedReceiver<Bytes>,
    mut grants: mpsc::UnboundedReceiver<()>,
    signals: mpsc::UnboundedSender<DialSignal>,
) {
    loop {
        // between connections there is no dialed device: outbound frames
        // fail like a rejected channel start and read grants go nowhere
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::info!(%peer, "outside proxy dialed in");
                    stream
                },
                Err(err) => {
                    tracing::error!(%err, "accept failed on the dial listener");
                    return;
                },
            },
            Some(_program) = writes.recv() => {
                tracing::warn!("no outside proxy dialed in, outbound frame dropped");
                continue;
            },
            Some(()) = grants.recv() => continue,
        };

        run_connection(stream, &mut writes, &mut grants, &signals).await;

        // the dialed line dropped; surface it and wait for the next dial
        let _ = signals.send(DialSignal::Stray(ChannelStatus::from_bits(
            ChannelStatus::UNIT_CHECK,
        )));
    }
}

/// Serve one dialed connection until it drops.
async fn run_connection(
    stream: TcpStream,
    writes: &mut mpsc::UnboundedReceiver<Bytes>,
    grants: &mut mpsc::UnboundedReceiver<()>,
    signals: &mpsc::UnboundedSender<DialSignal>,
) {
    let (reader, mut writer) = stream.into_split();

    // a dedicated task owns the read half so the select below only ever
    // waits on cancel-safe channel receives
    let (frames_tx, mut frames) = mpsc::unbounded_channel();
    let reader_task = tokio::spawn(read_loop(reader, frames_tx));

    let mut pending: VecDeque<Bytes> = VecDeque::new();
    let mut armed = false;

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if armed {
                        armed = false;
                        let _ = signals.send(DialSignal::ReadCompleted(frame));
                    } else {
                        pending.push_back(frame);
                        let _ = signals.send(DialSignal::Attention);
                    }
                },
                None => {
                    tracing::info!("outside proxy disconnected");
                    break;
                },
            },
            Some(program) = writes.recv() => {
                if let Err(first) = write_frame(&mut writer, &program).await {
                    tracing::warn!(%first, "channel write failed, retrying once");
                    if let Err(second) = write_frame(&mut writer, &program).await {
                        tracing::warn!(%second, "channel write failed twice, frame dropped");
                        continue;
                    }
                }
                let _ = signals.send(DialSignal::DeviceEnd);
            },
            Some(()) = grants.recv() => {
                if let Some(frame) = pending.pop_front() {
                    let _ = signals.send(DialSignal::ReadCompleted(frame));
                } else {
                    armed = true;
                }
            },
        }
    }

    reader_task.abort();
}

async fn read_loop(mut reader: OwnedReadHalf, frames: mpsc::UnboundedSender<Bytes>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(frame) => {
                if frames.send(frame).is_err() {
                    return;
                }
            },
            Err(_) => return,
        }
    }
}

async fn read_frame(reader: &mut OwnedReadHalf) -> std::io::Result<Bytes> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf).await?;
    let len = usize::from(u16::from_be_bytes(len_buf));

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    // like the real device's fixed read buffer, overlong input is cut off
    buf.truncate(RECV_BUFFER_LEN);
    Ok(Bytes::from(buf))
}

async fn write_frame(writer: &mut OwnedWriteHalf, frame: &Bytes) -> std::io::Result<()> {
    writer.write_all(&(frame.len() as u16).to_be_bytes()).await?;
    writer.write_all(frame).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_dial_write_signals_device_end() {
        let (mut port, mut driver, mut signals) = MemoryDial::new();
        port.issue(Bytes::from_static(b"frame"));

        assert_eq!(signals.recv().await, Some(DialSignal::DeviceEnd));
        assert_eq!(driver.next_written().await, Some(Bytes::from_static(b"frame")));
    }

    #[tokio::test]
    async fn memory_dial_inbound_waits_for_the_read() {
        let (mut port, driver, mut signals) = MemoryDial::new();

        driver.send(&b"\xF2"[..]);
        assert_eq!(signals.recv().await, Some(DialSignal::Attention));

        port.begin_read();
        assert_eq!(
            signals.recv().await,
            Some(DialSignal::ReadCompleted(Bytes::from_static(b"\xF2")))
        );
    }

    #[tokio::test]
    async fn memory_dial_armed_read_completes_on_arrival() {
        let (mut port, driver, mut signals) = MemoryDial::new();

        port.begin_read();
        driver.send(&b"\xF1"[..]);

        assert_eq!(
            signals.recv().await,
            Some(DialSignal::ReadCompleted(Bytes::from_static(b"\xF1")))
        );
    }
}
