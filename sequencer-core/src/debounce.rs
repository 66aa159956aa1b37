//! Per-key debounce for the keypad matrix

use crate::mailbox::KeyMailbox;
use crate::types::{Column, KeyPos, Row, RowSample, MATRIX_COLS, MATRIX_ROWS};

/// Debounce record for one physical key
#[derive(Copy, Clone, Debug)]
struct KeyRecord {
    /// Last accepted logical state (true = pressed)
    pressed: bool,
    /// Holdoff deadline in scan timer ticks, None when no suppression is
    /// active
    holdoff: Option<u16>,
}

impl KeyRecord {
    const fn released() -> Self {
        Self {
            pressed: false,
            holdoff: None,
        }
    }
}

/// Per-key debouncer over the whole 3x3 matrix.
///
/// Each key carries its own record, so chatter on one key never delays
/// events on another. A raw level that differs from the accepted state is
/// taken immediately unless the key is inside its holdoff window; accepting
/// a transition rearms the window. Time is the raw 16-bit scan timer count
/// and all deadline math wraps.
pub struct Debouncer {
    keys: [[KeyRecord; MATRIX_ROWS]; MATRIX_COLS],
    holdoff_ticks: u16,
}

impl Debouncer {
    pub const fn new(holdoff_ticks: u16) -> Self {
        Self {
            keys: [[KeyRecord::released(); MATRIX_ROWS]; MATRIX_COLS],
            holdoff_ticks,
        }
    }

    /// Feed the row sample captured for `col` at scan time `now`.
    ///
    /// Accepted presses are published to the mailbox; accepted releases
    /// only update the key record. Returns the number of transitions
    /// accepted from this sample.
    pub fn feed(&mut self, col: Column, sample: RowSample, now: u16, mailbox: &KeyMailbox) -> usize {
        let mut accepted = 0;
        for row in Row::ALL {
            let record = &mut self.keys[col.index()][row.index()];
            // Retire the holdoff on the first consult at or past its
            // deadline; a record can idle across counter wraps between
            // level changes, and a stale deadline reads as armed again
            if let Some(deadline) = record.holdoff {
                if !holdoff_pending(now, deadline, self.holdoff_ticks) {
                    record.holdoff = None;
                }
            }
            let pressed = sample.pressed(row);
            if pressed == record.pressed {
                continue;
            }
            if record.holdoff.is_some() {
                continue;
            }
            record.pressed = pressed;
            record.holdoff = Some(now.wrapping_add(self.holdoff_ticks));
            if pressed {
                mailbox.publish(KeyPos::new(col, row).digit());
            }
            accepted += 1;
        }
        accepted
    }

    /// Last accepted logical state of a key
    pub fn is_pressed(&self, key: KeyPos) -> bool {
        self.keys[key.col.index()][key.row.index()].pressed
    }

    /// Drop every holdoff so the next differing sample on any key is
    /// accepted immediately.
    ///
    /// Used as the stall fail-safe: when the scan timer wraps without any
    /// compare firing, pending deadlines are a full period stale and can no
    /// longer be compared meaningfully.
    pub fn force_expire(&mut self) {
        for col in self.keys.iter_mut() {
            for record in col.iter_mut() {
                record.holdoff = None;
            }
        }
    }
}

/// True while the holdoff deadline still lies ahead of `now` on the
/// wrapping 16-bit timer.
///
/// An armed deadline is never more than `window` ticks ahead of the
/// time it is consulted at, so any larger wrapping lead means the
/// deadline already passed, however long the record sat unconsulted.
fn holdoff_pending(now: u16, deadline: u16, window: u16) -> bool {
    let ahead = deadline.wrapping_sub(now);
    ahead != 0 && ahead <= window
}
