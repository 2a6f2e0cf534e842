//! Panel session lifecycle and steady-state operations.

use std::sync::{Mutex as StdMutex, MutexGuard};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::keypad::KeyEvent;
use crate::lcd::framebuffer::{Framebuffer, STRIPE_BYTES};
use crate::led::{Led, LedState};
use crate::link::protocol::{
    INIT_SEQUENCE, LCD_SLEEP, LCD_WAKE, RESET_HOLD, STRIPE_BULK, STRIPE_COLUMN, STRIPE_ROW,
    STRIPE_SELECT,
};
use crate::link::{EnableLine, Link, LinkState};

/// An open session with the control panel.
///
/// Opening resets the chip and runs its startup sequence; the session is
/// only handed out once the link is ready. Dropping the session (or calling
/// [`close`](Self::close)) cancels the receive loop and deasserts the
/// enable line on every exit path.
pub struct Panel {
    link: Link,
    enable: Box<dyn EnableLine>,
    framebuffer: StdMutex<Framebuffer>,
    leds: StdMutex<LedState>,
    closed: bool,
}

impl Panel {
    /// Resets the chip, brings the link up, and runs the startup sequence.
    ///
    /// `uart` must already be configured with the panel's framing (see
    /// [`open_serial`](crate::link::open_serial)); `enable` is the chip
    /// enable line. The call blocks until the chip has announced itself
    /// and every startup command has been acknowledged. On failure the
    /// receive loop is cancelled and the enable line deasserted before the
    /// error is returned.
    pub async fn open<T, E>(uart: T, enable: E) -> Result<Panel>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        E: EnableLine,
    {
        let mut enable: Box<dyn EnableLine> = Box::new(enable);

        // Soft reset: hold the enable line low, then release it.
        enable.set_enabled(false)?;
        debug!("link {}", LinkState::Resetting);
        sleep(RESET_HOLD).await;
        enable.set_enabled(true)?;

        let mut panel = Panel {
            link: Link::new(uart),
            enable,
            framebuffer: StdMutex::new(Framebuffer::new()),
            leds: StdMutex::new(LedState::new()),
            closed: false,
        };

        if let Err(error) = panel.initialize().await {
            let _ = panel.teardown();
            return Err(error);
        }
        info!("panel link ready");
        Ok(panel)
    }

    async fn initialize(&self) -> Result<()> {
        // The chip signals it is alive with its first byte after reset;
        // nothing may be transmitted until then.
        self.link.wait_for_first_byte().await;

        let mut tx = self.link.lock().await?;
        for command in INIT_SEQUENCE {
            tx.command(command).await?;
        }
        drop(tx);

        self.link.mark_ready();
        Ok(())
    }

    /// Current lifecycle state of the link.
    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// Locks the framebuffer for drawing.
    ///
    /// [`refresh`](Self::refresh) takes this lock for one stripe at a time,
    /// so drawing and refreshing from different tasks interleave safely.
    pub fn framebuffer(&self) -> MutexGuard<'_, Framebuffer> {
        self.framebuffer.lock().unwrap()
    }

    /// Turns one status LED on or off, leaving the other LED's bit
    /// untouched.
    ///
    /// Every call transmits a fresh LED command, whether or not the state
    /// changed.
    pub async fn set_led(&self, led: Led, on: bool) -> Result<()> {
        let mut tx = self.link.lock().await?;
        let command = {
            let mut leds = self.leds.lock().unwrap();
            leds.set(led, on);
            leds.command()
        };
        tx.command(command).await
    }

    /// Last state commanded for the given LED.
    pub fn is_led_on(&self, led: Led) -> bool {
        self.leds.lock().unwrap().is_on(led)
    }

    /// Pushes the whole framebuffer to the LCD.
    ///
    /// The five display stripes go out strictly top to bottom under one
    /// transmit-gate acquisition, so concurrent refreshes can never
    /// interleave their stripes and no other command can slip in between.
    pub async fn refresh(&self) -> Result<()> {
        let mut tx = self.link.lock().await?;
        for (number, select) in STRIPE_SELECT.iter().enumerate() {
            // Borrow the framebuffer just long enough to copy one stripe.
            let mut stripe = [0u8; STRIPE_BYTES];
            stripe.copy_from_slice(self.framebuffer.lock().unwrap().stripe(number));

            tx.command(*select).await?;
            tx.command(STRIPE_COLUMN).await?;
            tx.command(STRIPE_ROW).await?;
            tx.command(STRIPE_BULK).await?;
            tx.bulk(&stripe).await?;
        }
        Ok(())
    }

    /// Wakes the LCD or puts it to sleep, as the printer's main board does
    /// around standby.
    pub async fn set_display_power(&self, on: bool) -> Result<()> {
        self.link
            .command(if on { LCD_WAKE } else { LCD_SLEEP })
            .await
    }

    /// Returns the oldest pending key event, or `None` if the queue is
    /// empty. Never blocks.
    pub fn poll_key_event(&self) -> Option<KeyEvent> {
        self.link.poll_key_event()
    }

    /// Tears the session down: cancels the receive loop and deasserts the
    /// enable line.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.link.shutdown();
        self.enable.set_enabled(false)?;
        Ok(())
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        if let Err(error) = self.teardown() {
            warn!("failed to deassert enable line: {error}");
        }
    }
}
