//! Key scan report decoder and event queue.

use std::collections::VecDeque;

use tracing::trace;

use super::{KeyEvent, Keycode};

/// Maximum number of queued key events. Events arriving while the queue is
/// full are discarded; queued events are never evicted.
pub const KEY_EVENT_QUEUE_LENGTH: usize = 64;

/// Turns the chip's key scan report stream into press/release events.
///
/// The hardware reports only the single currently pressed key, so a report
/// change from key A straight to key B synthesizes release(A) followed by
/// press(B), keeping every key's press/release events paired.
pub(crate) struct KeyScanDecoder {
    last_report: u8,
    queue: VecDeque<KeyEvent>,
}

impl KeyScanDecoder {
    pub fn new() -> Self {
        Self {
            last_report: Keycode::NONE.0,
            queue: VecDeque::with_capacity(KEY_EVENT_QUEUE_LENGTH),
        }
    }

    /// Feeds one scan report byte. An unchanged report is a no-op.
    pub fn report(&mut self, code: u8) {
        if code == self.last_report {
            return;
        }
        if self.last_report != Keycode::NONE.0 {
            self.push(KeyEvent {
                key: Keycode(self.last_report),
                pressed: false,
            });
        }
        if code != Keycode::NONE.0 {
            self.push(KeyEvent {
                key: Keycode(code),
                pressed: true,
            });
        }
        self.last_report = code;
    }

    /// Pops the oldest pending event, if any.
    pub fn pop(&mut self) -> Option<KeyEvent> {
        self.queue.pop_front()
    }

    fn push(&mut self, event: KeyEvent) {
        if self.queue.len() < KEY_EVENT_QUEUE_LENGTH {
            self.queue.push_back(event);
        } else {
            trace!("key event queue full, dropping {:?}", event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_then_release() {
        let mut decoder = KeyScanDecoder::new();
        decoder.report(0x80);
        decoder.report(0x8A);
        decoder.report(0x80);

        assert_eq!(
            decoder.pop(),
            Some(KeyEvent {
                key: Keycode::ONE,
                pressed: true
            })
        );
        assert_eq!(
            decoder.pop(),
            Some(KeyEvent {
                key: Keycode::ONE,
                pressed: false
            })
        );
        assert_eq!(decoder.pop(), None);
    }

    #[test]
    fn test_steady_state_is_silent() {
        let mut decoder = KeyScanDecoder::new();
        for _ in 0..10 {
            decoder.report(0x80);
        }
        assert_eq!(decoder.pop(), None);

        decoder.report(0xC9);
        decoder.pop();
        for _ in 0..10 {
            decoder.report(0xC9);
        }
        assert_eq!(decoder.pop(), None);
    }

    #[test]
    fn test_key_rollover_synthesizes_release() {
        let mut decoder = KeyScanDecoder::new();
        decoder.report(Keycode::ONE.0);
        decoder.report(Keycode::TWO.0);

        assert_eq!(
            decoder.pop(),
            Some(KeyEvent {
                key: Keycode::ONE,
                pressed: true
            })
        );
        assert_eq!(
            decoder.pop(),
            Some(KeyEvent {
                key: Keycode::ONE,
                pressed: false
            })
        );
        assert_eq!(
            decoder.pop(),
            Some(KeyEvent {
                key: Keycode::TWO,
                pressed: true
            })
        );
        assert_eq!(decoder.pop(), None);
    }

    #[test]
    fn test_unknown_codes_still_decode() {
        let mut decoder = KeyScanDecoder::new();
        decoder.report(0x8F);
        let event = decoder.pop().unwrap();
        assert!(event.pressed);
        assert_eq!(event.key.to_string(), "0x8F");
    }

    #[test]
    fn test_queue_overflow_drops_newest() {
        let mut decoder = KeyScanDecoder::new();

        // 70 alternating report changes, one event each.
        for i in 0..35u8 {
            decoder.report(0x89 + (i % 4) * 2);
            decoder.report(0x80);
        }

        let mut events = Vec::new();
        while let Some(event) = decoder.pop() {
            events.push(event);
        }
        assert_eq!(events.len(), KEY_EVENT_QUEUE_LENGTH);

        // Oldest events survive, in order: press, release, press, ...
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.pressed, i % 2 == 0);
        }
        assert_eq!(events[0].key, Keycode(0x89));
        assert_eq!(events[1].key, Keycode(0x89));

        // The decoder keeps working once drained.
        decoder.report(0xC9);
        assert_eq!(
            decoder.pop(),
            Some(KeyEvent {
                key: Keycode::OK,
                pressed: true
            })
        );
    }
}
