//! Song grid storage and the edit cursor

use portable_atomic::{AtomicU8, Ordering};

use crate::types::{Direction, Pitch, PITCH_COUNT, STEP_COUNT};

/// Slot value for an empty step
pub const EMPTY_SLOT: u8 = 0;

/// The 20-step song.
///
/// Each step holds at most one pitch, stored as a single byte slot
/// (0 = empty, otherwise a pitch code). Slots are individual atomics so the
/// sequencer tick can read the grid lock-free while the main loop edits it;
/// a step never holds a torn or half-written value.
pub struct Song {
    slots: [AtomicU8; STEP_COUNT],
}

impl Song {
    pub const fn new() -> Self {
        const EMPTY: AtomicU8 = AtomicU8::new(EMPTY_SLOT);
        Self {
            slots: [EMPTY; STEP_COUNT],
        }
    }

    /// Pitch stored at `step`, None when the slot is empty or out of range
    pub fn pitch_at(&self, step: u8) -> Option<Pitch> {
        let slot = self.slots.get(step as usize)?;
        Pitch::from_code(slot.load(Ordering::Relaxed))
    }

    /// Store or clear the slot at `step`
    pub fn set(&self, step: u8, pitch: Option<Pitch>) {
        if let Some(slot) = self.slots.get(step as usize) {
            let code = match pitch {
                Some(p) => p.code(),
                None => EMPTY_SLOT,
            };
            slot.store(code, Ordering::Relaxed);
        }
    }

    /// Toggle `pitch` at `step`: clear the slot when it already holds that
    /// pitch, otherwise overwrite it. Returns true when the slot now holds
    /// the pitch.
    pub fn toggle(&self, step: u8, pitch: Pitch) -> bool {
        match self.pitch_at(step) {
            Some(current) if current == pitch => {
                self.set(step, None);
                false
            }
            _ => {
                self.set(step, Some(pitch));
                true
            }
        }
    }

    /// Reset every step to empty
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(EMPTY_SLOT, Ordering::Relaxed);
        }
    }

    /// True when no step holds a pitch
    pub fn is_empty(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.load(Ordering::Relaxed) == EMPTY_SLOT)
    }

    /// Copy of the whole grid, for rendering
    pub fn snapshot(&self) -> [Option<Pitch>; STEP_COUNT] {
        let mut grid = [None; STEP_COUNT];
        for (step, slot) in self.slots.iter().enumerate() {
            grid[step] = Pitch::from_code(slot.load(Ordering::Relaxed));
        }
        grid
    }
}

impl Default for Song {
    fn default() -> Self {
        Self::new()
    }
}

/// Edit cursor over the song grid.
///
/// `step` selects the column (0..20), `row` the pitch lane (0 = top).
/// Owned by the main loop only, so it is a plain struct.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Cursor {
    pub step: u8,
    pub row: u8,
}

impl Cursor {
    pub const fn new() -> Self {
        Self { step: 0, row: 0 }
    }

    /// Move one cell in `dir`, clamped at the grid edges.
    ///
    /// Returns false when the cursor was already at the edge and the move
    /// was a silent no-op.
    pub fn shift(&mut self, dir: Direction) -> bool {
        match dir {
            Direction::Up if self.row > 0 => {
                self.row -= 1;
                true
            }
            Direction::Down if (self.row as usize) + 1 < PITCH_COUNT => {
                self.row += 1;
                true
            }
            Direction::Left if self.step > 0 => {
                self.step -= 1;
                true
            }
            Direction::Right if (self.step as usize) + 1 < STEP_COUNT => {
                self.step += 1;
                true
            }
            _ => false,
        }
    }

    /// Pitch lane under the cursor
    pub fn pitch(&self) -> Option<Pitch> {
        Pitch::from_row(self.row)
    }
}
