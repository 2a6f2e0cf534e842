//! Link driver: transport ownership, the receive loop, and the
//! send/acknowledge/retry cycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

use super::protocol::{Command, ACK, ACK_TIMEOUT, STATUS_UNKNOWN, TX_RETRY_LIMIT};
use crate::error::{Error, Result};
use crate::keypad::decoder::KeyScanDecoder;
use crate::keypad::KeyEvent;

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Link lifecycle states, in the order they are normally reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    /// Enable line held low, chip in reset.
    Disabled = 0,
    /// Reset pulse in progress.
    Resetting = 1,
    /// Receive loop running, chip has not sent anything yet.
    AwaitingFirstByte = 2,
    /// Startup command sequence being transmitted.
    Initializing = 3,
    /// Steady state, commands accepted.
    Ready = 4,
    /// Torn down.
    Closed = 5,
}

impl LinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disabled,
            1 => Self::Resetting,
            2 => Self::AwaitingFirstByte,
            3 => Self::Initializing,
            4 => Self::Ready,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Disabled => "disabled",
            LinkState::Resetting => "resetting",
            LinkState::AwaitingFirstByte => "awaiting first byte",
            LinkState::Initializing => "initializing",
            LinkState::Ready => "ready",
            LinkState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// State shared between the receive loop and senders.
///
/// The acknowledgement counter and the key scan decoder are the only two
/// pieces the receive loop publishes into; everything else on the link is
/// reached through the transmit gate.
struct Shared {
    state: AtomicU8,
    /// Set once the chip has sent its first byte after reset.
    alive: AtomicBool,
    alive_notify: Notify,
    /// Outstanding acknowledgements. Never observed negative: consumers
    /// decrement with a checked subtraction.
    ack_count: AtomicU32,
    ack_notify: Notify,
    decoder: StdMutex<KeyScanDecoder>,
}

impl Shared {
    fn state(&self) -> LinkState {
        LinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn move_to(&self, next: LinkState) {
        self.state.store(next as u8, Ordering::Release);
        debug!("link {next}");
    }

    /// Dispatches one received byte. Runs on the receive loop only.
    fn handle_byte(&self, byte: u8) {
        if !self.alive.load(Ordering::Acquire) {
            // Chip is alive; startup transmission may begin.
            self.move_to(LinkState::Initializing);
            self.alive.store(true, Ordering::Release);
            self.alive_notify.notify_waiters();
        }
        match byte {
            ACK => {
                self.ack_count.fetch_add(1, Ordering::AcqRel);
                self.ack_notify.notify_one();
            }
            STATUS_UNKNOWN => {
                // Trails key scan reports. Meaning unknown, discarded.
                trace!("ignoring status byte 0x40");
            }
            report => self.decoder.lock().unwrap().report(report),
        }
    }

    /// Consumes one acknowledgement if any is pending.
    fn take_ack(&self) -> bool {
        self.ack_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .is_ok()
    }

    /// Waits up to [`ACK_TIMEOUT`] for an acknowledgement and consumes it.
    /// At most one acknowledgement is consumed per call.
    async fn wait_for_ack(&self) -> bool {
        let deadline = Instant::now() + ACK_TIMEOUT;
        loop {
            if self.take_ack() {
                return true;
            }
            let notified = self.ack_notify.notified();
            if self.take_ack() {
                return true;
            }
            if timeout_at(deadline, notified).await.is_err() {
                return self.take_ack();
            }
        }
    }

    async fn wait_for_first_byte(&self) {
        while !self.alive.load(Ordering::Acquire) {
            let notified = self.alive_notify.notified();
            if self.alive.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

/// The UART link to the chip.
///
/// Owns both transport halves: the read half lives inside a spawned receive
/// loop, the write half sits behind the transmit gate.
pub(crate) struct Link {
    writer: Mutex<BoxedWriter>,
    shared: Arc<Shared>,
    receiver: JoinHandle<()>,
}

impl Link {
    /// Takes ownership of the transport and starts the receive loop.
    pub fn new<T>(uart: T) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(uart);
        let shared = Arc::new(Shared {
            state: AtomicU8::new(LinkState::AwaitingFirstByte as u8),
            alive: AtomicBool::new(false),
            alive_notify: Notify::new(),
            ack_count: AtomicU32::new(0),
            ack_notify: Notify::new(),
            decoder: StdMutex::new(KeyScanDecoder::new()),
        });
        let receiver = tokio::spawn(receive_loop(Box::new(reader), shared.clone()));
        Self {
            writer: Mutex::new(Box::new(writer)),
            shared,
            receiver,
        }
    }

    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    /// Blocks until the chip has sent its first byte after reset. Nothing
    /// may be transmitted before then.
    pub async fn wait_for_first_byte(&self) {
        self.shared.wait_for_first_byte().await;
    }

    pub fn mark_ready(&self) {
        self.shared.move_to(LinkState::Ready);
    }

    /// Acquires the transmit gate.
    ///
    /// Exactly one send/acknowledge/retry cycle runs at a time across the
    /// whole link; holding the guard across a multi-command sequence keeps
    /// unrelated commands from being interleaved into it.
    pub async fn lock(&self) -> Result<TxGuard<'_>> {
        let writer = self.writer.lock().await;
        match self.shared.state() {
            LinkState::Initializing | LinkState::Ready => Ok(TxGuard {
                writer,
                shared: &self.shared,
            }),
            state => Err(Error::NotReady(state)),
        }
    }

    /// Sends a single command through the full send/acknowledge/retry cycle.
    pub async fn command(&self, command: Command) -> Result<()> {
        let mut tx = self.lock().await?;
        tx.command(command).await
    }

    /// Returns the oldest pending key event, if any.
    pub fn poll_key_event(&self) -> Option<KeyEvent> {
        self.shared.decoder.lock().unwrap().pop()
    }

    /// Cancels the receive loop and refuses further commands.
    pub fn shutdown(&self) {
        self.shared.move_to(LinkState::Closed);
        self.receiver.abort();
    }
}

/// Exclusive access to the transmit side of the link.
pub(crate) struct TxGuard<'a> {
    writer: MutexGuard<'a, BoxedWriter>,
    shared: &'a Shared,
}

impl TxGuard<'_> {
    /// Sends one two-byte command, retrying until acknowledged.
    pub async fn command(&mut self, command: Command) -> Result<()> {
        self.write_acked(&command).await
    }

    /// Sends a raw bulk payload, retrying until acknowledged. The matching
    /// bulk-length command must have been sent immediately before.
    pub async fn bulk(&mut self, payload: &[u8]) -> Result<()> {
        self.write_acked(payload).await
    }

    /// The send/acknowledge/retry cycle. Repeating the same bytes is
    /// idempotent for every known command, so an attempt whose reply was
    /// lost or garbled is simply transmitted again.
    async fn write_acked(&mut self, bytes: &[u8]) -> Result<()> {
        for attempt in 1..=TX_RETRY_LIMIT + 1 {
            self.writer.write_all(bytes).await?;
            self.writer.flush().await?;
            if self.shared.wait_for_ack().await {
                return Ok(());
            }
            if attempt <= TX_RETRY_LIMIT {
                match bytes {
                    [opcode, parameter] => {
                        debug!("no ack for 0x{opcode:02X} 0x{parameter:02X}, retrying")
                    }
                    _ => debug!("no ack for {} byte bulk payload, retrying", bytes.len()),
                }
            }
        }
        Err(Error::NoAcknowledgement(TX_RETRY_LIMIT + 1))
    }
}

/// Drains inbound bytes for the lifetime of the link.
async fn receive_loop(mut reader: BoxedReader, shared: Arc<Shared>) {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte).await {
            Ok(0) => {
                debug!("UART transport closed");
                break;
            }
            Ok(_) => shared.handle_byte(byte[0]),
            Err(error) => {
                warn!("UART read failed: {error}");
                break;
            }
        }
    }
}
