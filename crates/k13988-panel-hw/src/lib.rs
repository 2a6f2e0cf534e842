//! K13988 Panel Hardware Library
//!
//! Drives the control panel of Canon Pixma MX340-family multifunction
//! printers over the panel connector's UART, letting the host take the
//! place of the printer's main logic board: two status LEDs, the 196x34
//! monochrome LCD, and the key matrix behind the NEC K13988 chip.
//!
//! ```no_run
//! use k13988_panel_hw::{link, Led, Panel};
//!
//! # async fn demo() -> k13988_panel_hw::Result<()> {
//! let port = link::open_serial("/dev/ttyUSB0")?;
//! let panel = Panel::open(port, ()).await?;
//!
//! panel.set_led(Led::Wifi, true).await?;
//! panel.framebuffer().fill_rect(0, 0, 196, 8, true);
//! panel.refresh().await?;
//!
//! while let Some(event) = panel.poll_key_event() {
//!     println!("{} {}", event.key, if event.pressed { "down" } else { "up" });
//! }
//! panel.close()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod keypad;
pub mod lcd;
pub mod led;
pub mod link;
mod panel;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};
pub use keypad::{KeyEvent, Keycode};
pub use lcd::Framebuffer;
pub use led::Led;
pub use link::{open_serial, EnableLine, LinkState};
pub use panel::Panel;

/// LCD display dimensions in pixels.
pub const LCD_WIDTH: u16 = 196;
pub const LCD_HEIGHT: u16 = 34;
