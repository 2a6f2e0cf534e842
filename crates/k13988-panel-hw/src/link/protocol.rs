//! Wire protocol constants for the K13988 link.
//!
//! Every value here was captured with a logic analyzer watching the UART
//! traffic of a running printer. Several command pairs are reproduced
//! without a full understanding of what they configure; the chip will not
//! leave its startup state unless it receives them in this exact order.

use std::time::Duration;

/// UART baud rate of the panel link.
pub const BAUD_RATE: u32 = 250_000;

/// Acknowledgement byte sent by the chip after every command and after
/// every completed bulk payload.
pub const ACK: u8 = 0x20;

/// Status byte that trails key scan reports. Its meaning is unknown; the
/// driver discards it rather than guess.
pub const STATUS_UNKNOWN: u8 = 0x40;

/// Scan report value when no key is pressed.
pub const KEY_NONE: u8 = 0x80;

/// Per-attempt wait for an acknowledgement before resending.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(20);

/// Resends allowed after the first unacknowledged transmission.
pub const TX_RETRY_LIMIT: u32 = 16;

/// How long the enable line is held low to soft-reset the chip.
pub const RESET_HOLD: Duration = Duration::from_millis(250);

/// A two-byte protocol unit: opcode followed by one parameter byte.
pub type Command = [u8; 2];

/// Opcode for LED control; the parameter carries the LED bit flags.
pub const LED_OPCODE: u8 = 0x0E;

/// Bulk transfer opcode; the parameter is the length in bytes of the raw
/// payload that follows.
pub const BULK_OPCODE: u8 = 0x06;

/// Stripe select commands, one per 8-row display stripe, top to bottom.
pub const STRIPE_SELECT: [Command; 5] = [
    [0x04, 0x4D],
    [0x04, 0xCD],
    [0x04, 0x2D],
    [0x04, 0xAD],
    [0x04, 0x6D],
];

/// Column address setup sent after a stripe select.
pub const STRIPE_COLUMN: Command = [0x04, 0xC8];

/// Row address setup sent after the column address.
pub const STRIPE_ROW: Command = [0x04, 0x30];

/// Bulk-length header for one stripe: 196 (0xC4) raw bytes follow.
pub const STRIPE_BULK: Command = [BULK_OPCODE, 0xC4];

/// Puts the LCD to sleep. Observed from the main board when the printer
/// enters standby.
pub const LCD_SLEEP: Command = [0x04, 0x75];

/// Wakes the LCD. Also the final command of the startup sequence.
pub const LCD_WAKE: Command = [0x04, 0xF5];

/// Startup command sequence for the chip, sent once after reset.
///
/// The key matrix report drops from two bytes (0x80 0x40) to a single byte
/// (0x80) partway through this sequence, and `0x04 0x42` shifts the frame
/// buffer up by 2 pixels so stripe 0 starts at the top-left corner.
pub const INIT_SEQUENCE: [Command; 20] = [
    [0xFE, 0xDC], // Hello
    [0x0E, 0xFD], // Both LEDs off
    [0x0D, 0x3F],
    [0x0C, 0xE1],
    [0x07, 0xA1],
    [0x03, 0x00],
    [0x01, 0x00],
    [0x0E, 0xFC], // Both LEDs off, again
    [0x04, 0xD5],
    [0x04, 0x85],
    [0x04, 0x03],
    [0x04, 0xC5],
    [0x04, 0x34],
    [0x04, 0x74],
    [0x04, 0xF4],
    [0x04, 0x44],
    [0x04, 0x81],
    [0x04, 0x04],
    [0x04, 0x42],
    LCD_WAKE,
];
