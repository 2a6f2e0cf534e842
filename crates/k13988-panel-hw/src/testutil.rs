//! Simulated panel chip for link and session tests.
//!
//! The simulator sits on the far end of an in-memory duplex pipe and
//! reassembles the host's byte stream into protocol units with the same
//! state machine the passive bus sniffer uses: two-byte commands, except
//! that a bulk header announces a run of raw payload bytes. Each completed
//! unit is acknowledged according to the configured policy.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::link::protocol::{ACK, BULK_OPCODE, KEY_NONE};

/// Acknowledgement policy of the simulated chip.
#[derive(Clone, Copy)]
pub(crate) enum AckMode {
    /// Acknowledge every completed protocol unit.
    Always,
    /// Never acknowledge anything.
    Never,
    /// Acknowledge a unit only once the same bytes have arrived this many
    /// times in a row.
    AfterAttempts(u32),
}

pub(crate) struct ChipSim {
    written: Arc<Mutex<Vec<u8>>>,
    inject: mpsc::UnboundedSender<Vec<u8>>,
    _task: JoinHandle<()>,
}

impl ChipSim {
    /// Spawns a simulated chip and returns the host side of the pipe.
    ///
    /// With `announce` set the chip immediately sends the idle key report,
    /// which is how the real hardware signals it is alive after reset.
    pub fn spawn(ack: AckMode, announce: bool) -> (DuplexStream, ChipSim) {
        let (host, device) = tokio::io::duplex(4096);
        let written = Arc::new(Mutex::new(Vec::new()));
        let (inject, inject_rx) = mpsc::unbounded_channel();
        if announce {
            inject.send(vec![KEY_NONE]).unwrap();
        }
        let task = tokio::spawn(run(device, ack, written.clone(), inject_rx));
        (
            host,
            ChipSim {
                written,
                inject,
                _task: task,
            },
        )
    }

    /// Every byte the host has transmitted so far.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    /// Sends raw bytes from the chip to the host.
    pub fn send(&self, bytes: &[u8]) {
        self.inject.send(bytes.to_vec()).unwrap();
    }
}

async fn run(
    device: DuplexStream,
    ack: AckMode,
    written: Arc<Mutex<Vec<u8>>>,
    mut inject: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let (mut reader, mut writer) = tokio::io::split(device);
    let mut parser = UnitParser::new();
    let mut previous: Option<Vec<u8>> = None;
    let mut repeats = 0u32;
    let mut buffer = [0u8; 256];

    loop {
        tokio::select! {
            outbound = inject.recv() => match outbound {
                Some(bytes) => {
                    let _ = writer.write_all(&bytes).await;
                }
                None => break,
            },
            read = reader.read(&mut buffer) => {
                let count = match read {
                    Ok(0) | Err(_) => break,
                    Ok(count) => count,
                };
                written.lock().unwrap().extend_from_slice(&buffer[..count]);
                for &byte in &buffer[..count] {
                    let Some(unit) = parser.feed(byte) else {
                        continue;
                    };
                    let acknowledge = match ack {
                        AckMode::Always => true,
                        AckMode::Never => false,
                        AckMode::AfterAttempts(required) => {
                            if previous.as_deref() == Some(&unit[..]) {
                                repeats += 1;
                            } else {
                                previous = Some(unit);
                                repeats = 1;
                            }
                            repeats >= required
                        }
                    };
                    if acknowledge {
                        let _ = writer.write_all(&[ACK]).await;
                    }
                }
            }
        }
    }
}

/// Reassembles the host byte stream into acknowledgeable protocol units.
struct UnitParser {
    opcode: Option<u8>,
    bulk_remaining: usize,
    payload: Vec<u8>,
}

impl UnitParser {
    fn new() -> Self {
        Self {
            opcode: None,
            bulk_remaining: 0,
            payload: Vec::new(),
        }
    }

    fn feed(&mut self, byte: u8) -> Option<Vec<u8>> {
        if self.bulk_remaining > 0 {
            self.payload.push(byte);
            self.bulk_remaining -= 1;
            if self.bulk_remaining == 0 {
                return Some(std::mem::take(&mut self.payload));
            }
            return None;
        }
        match self.opcode.take() {
            None => {
                self.opcode = Some(byte);
                None
            }
            Some(opcode) => {
                if opcode == BULK_OPCODE {
                    self.bulk_remaining = byte as usize;
                }
                Some(vec![opcode, byte])
            }
        }
    }
}
