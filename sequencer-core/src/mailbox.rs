//! Single-slot key event mailbox between interrupt and main-loop context

use portable_atomic::{AtomicU8, Ordering};

/// Latest-key mailbox.
///
/// The scan interrupt publishes the ASCII digit of each accepted key press;
/// the main loop drains it with [`take`](KeyMailbox::take). The slot holds
/// one event and a new press overwrites an unconsumed one, so after a burst
/// only the most recent key survives. Zero is the empty sentinel and never
/// collides with a key code.
pub struct KeyMailbox {
    slot: AtomicU8,
}

impl KeyMailbox {
    /// Create an empty mailbox (const, usable in statics)
    pub const fn new() -> Self {
        Self {
            slot: AtomicU8::new(0),
        }
    }

    /// Publish a key digit, overwriting any pending event.
    ///
    /// Safe to call from interrupt context; this is a single atomic store.
    pub fn publish(&self, digit: u8) {
        self.slot.store(digit, Ordering::Release);
    }

    /// Take the pending key digit and clear the slot
    pub fn take(&self) -> Option<u8> {
        match self.slot.swap(0, Ordering::Acquire) {
            0 => None,
            digit => Some(digit),
        }
    }

    /// True when an event is waiting (does not consume it)
    pub fn is_pending(&self) -> bool {
        self.slot.load(Ordering::Relaxed) != 0
    }
}

impl Default for KeyMailbox {
    fn default() -> Self {
        Self::new()
    }
}
