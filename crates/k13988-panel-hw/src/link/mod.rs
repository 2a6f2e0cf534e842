//! UART link to the panel chip.
//!
//! The link owns the byte transport: a spawned receive loop continuously
//! drains inbound traffic (acknowledgements, the ignored `0x40` status byte,
//! key scan reports) while senders serialize through a single transmit gate
//! that runs the send/acknowledge/retry cycle.

mod driver;
pub(crate) mod protocol;

pub(crate) use driver::Link;
pub use driver::LinkState;

use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::error::Result;
use protocol::BAUD_RATE;

/// The chip enable line.
///
/// The session holds this line low through a reset pulse, releases it to
/// bring the chip up, and deasserts it again on teardown. Board
/// integrations implement this for whatever GPIO or modem-control line is
/// wired to the chip's enable pin.
pub trait EnableLine: Send + Sync + 'static {
    /// Drives the line high (`true`) or low (`false`).
    fn set_enabled(&mut self, enabled: bool) -> std::io::Result<()>;
}

/// Hard-wired enable, for boards where the enable pin is strapped high.
impl EnableLine for () {
    fn set_enabled(&mut self, _enabled: bool) -> std::io::Result<()> {
        Ok(())
    }
}

/// Opens a serial port with the UART framing the chip expects:
/// 250 000 baud, 8 data bits, even parity, 2 stop bits.
///
/// Passive captures of this bus have historically been made with 1 stop
/// bit; the 2 stop bit configuration is what the printer's own main board
/// drives and is authoritative for active communication.
pub fn open_serial(path: &str) -> Result<SerialStream> {
    let port = tokio_serial::new(path, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::Even)
        .stop_bits(StopBits::Two)
        .open_native_async()?;
    Ok(port)
}
