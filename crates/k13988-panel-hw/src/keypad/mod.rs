//! Key matrix input from the control panel.
//!
//! The chip scans the panel's key matrix and reports the currently pressed
//! key as a single byte, or [`Keycode::NONE`] when nothing is held down.
//! The scan decoder turns that report stream into discrete press/release
//! events, polled one at a time through
//! [`Panel::poll_key_event`](crate::Panel::poll_key_event).

pub(crate) mod decoder;

pub use decoder::KEY_EVENT_QUEUE_LENGTH;

use crate::link::protocol::KEY_NONE;

/// Key scan code reported by the chip.
///
/// Known codes fall in the sparse range `0x89..=0xCC`. Codes outside the
/// name table still decode into events; only the display label degrades to
/// a hex rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keycode(pub u8);

impl Keycode {
    /// Scan report value when no key is pressed.
    pub const NONE: Keycode = Keycode(KEY_NONE);

    pub const COPY: Keycode = Keycode(0xA9);
    pub const FAX: Keycode = Keycode(0xAB);
    pub const SCAN: Keycode = Keycode(0xAC);

    pub const MENU: Keycode = Keycode(0x94);
    pub const SETTINGS: Keycode = Keycode(0x92);
    pub const FAX_QUALITY: Keycode = Keycode(0x91);

    pub const BACK: Keycode = Keycode(0x93);
    pub const LEFT: Keycode = Keycode(0xCB);
    pub const RIGHT: Keycode = Keycode(0xCA);
    pub const OK: Keycode = Keycode(0xC9);

    pub const ONE: Keycode = Keycode(0x8A);
    pub const TWO: Keycode = Keycode(0x9A);
    pub const THREE: Keycode = Keycode(0xA2);
    pub const FOUR: Keycode = Keycode(0x8C);
    pub const FIVE: Keycode = Keycode(0x9C);
    pub const SIX: Keycode = Keycode(0xA4);
    pub const SEVEN: Keycode = Keycode(0x89);
    pub const EIGHT: Keycode = Keycode(0x99);
    pub const NINE: Keycode = Keycode(0xA1);
    pub const ASTERISK: Keycode = Keycode(0x8B);
    pub const ZERO: Keycode = Keycode(0x9B);
    pub const POUND: Keycode = Keycode(0xA3);

    pub const REDIAL: Keycode = Keycode(0xB2);
    pub const CODED_DIAL: Keycode = Keycode(0xB4);
    pub const HOOK: Keycode = Keycode(0xCC);

    pub const BLACK: Keycode = Keycode(0xB1);
    pub const COLOR: Keycode = Keycode(0xB3);

    /// Returns the human-readable key name, if the code is known.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Keycode::NONE => "(None)",
            Keycode::COPY => "Copy",
            Keycode::FAX => "Fax",
            Keycode::SCAN => "Scan",
            Keycode::MENU => "Menu",
            Keycode::SETTINGS => "Settings",
            Keycode::FAX_QUALITY => "Fax Quality",
            Keycode::BACK => "Back",
            Keycode::LEFT => "Left (-)",
            Keycode::RIGHT => "Right (+)",
            Keycode::OK => "OK",
            Keycode::ONE => "1",
            Keycode::TWO => "2",
            Keycode::THREE => "3",
            Keycode::FOUR => "4",
            Keycode::FIVE => "5",
            Keycode::SIX => "6",
            Keycode::SEVEN => "7",
            Keycode::EIGHT => "8",
            Keycode::NINE => "9",
            Keycode::ASTERISK => "*",
            Keycode::ZERO => "0",
            Keycode::POUND => "#",
            Keycode::REDIAL => "Redial/Pause",
            Keycode::CODED_DIAL => "Coded Dial",
            Keycode::HOOK => "Hook",
            Keycode::BLACK => "Black",
            Keycode::COLOR => "Color",
            _ => return None,
        })
    }
}

impl std::fmt::Display for Keycode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// A key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Scan code of the key.
    pub key: Keycode,
    /// True for press, false for release.
    pub pressed: bool,
}
