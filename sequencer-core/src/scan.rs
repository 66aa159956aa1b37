//! Keypad matrix scanner built on chained timer compare events
//!
//! One column is driven at a time. Each column owns one compare channel of
//! a free-running 16-bit timer and the three channels take turns: a
//! channel's compare ends either its column's dwell (sample the rows, then
//! release the line) or the dead-time gap before it (drive the line). Every
//! next deadline is computed from the previous scheduled deadline, never
//! from a re-read counter, so the cadence cannot drift however late the
//! interrupt runs.

use crate::debounce::Debouncer;
use crate::hal::{ColumnDrive, RowSense};
use crate::mailbox::KeyMailbox;
use crate::types::{Column, KeyPos};

/// Scan rotation phase
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScanPhase {
    /// Column is driven; rows settle until the dwell deadline
    Dwell(Column),
    /// No column is driven; this column goes active at the gap deadline
    Gap(Column),
}

/// Work ordered by a phase transition
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScanAction {
    /// Gap over: drive `col` now and rearm its own channel at `deadline`
    /// (the end of its dwell)
    Drive { col: Column, deadline: u16 },
    /// Dwell over: sample the rows while `col` is still driven, then
    /// release it, then arm the next column's channel at `deadline` (the
    /// end of the gap)
    Sample { col: Column, deadline: u16 },
}

/// Column rotation state machine.
///
/// Pure bookkeeping over wrapping 16-bit deadlines; pin and timer access
/// stay with the caller. Each compare event advances the phase and yields
/// the action plus the next deadline to arm.
pub struct ScanState {
    phase: ScanPhase,
    deadline: u16,
    dwell_ticks: u16,
    dead_ticks: u16,
    compare_seen: bool,
}

impl ScanState {
    pub const fn new(dwell_ticks: u16, dead_ticks: u16) -> Self {
        Self {
            phase: ScanPhase::Gap(Column::Col0),
            deadline: 0,
            dwell_ticks,
            dead_ticks,
            compare_seen: false,
        }
    }

    /// Arm the rotation at counter value `now`.
    ///
    /// The machine enters the gap before column 0 and returns the first
    /// activation deadline of each column's channel, one scan slot apart,
    /// so all three comparators can be armed before interrupts are enabled.
    /// The running chain later rewrites each channel with these same
    /// values.
    pub fn start(&mut self, now: u16) -> [u16; 3] {
        let slot = self.dwell_ticks.wrapping_add(self.dead_ticks);
        self.phase = ScanPhase::Gap(Column::Col0);
        self.deadline = now.wrapping_add(self.dead_ticks);
        self.compare_seen = false;
        [
            self.deadline,
            self.deadline.wrapping_add(slot),
            self.deadline.wrapping_add(slot.wrapping_mul(2)),
        ]
    }

    /// Advance the phase for a compare event on `channel`.
    ///
    /// Returns None for an out-of-phase compare. That happens when a stale
    /// comparator value matches again a full counter wrap after it was
    /// superseded; the rotation is left untouched and the event dropped.
    pub fn on_compare(&mut self, channel: Column) -> Option<ScanAction> {
        self.compare_seen = true;
        match self.phase {
            ScanPhase::Gap(col) if channel == col => {
                self.deadline = self.deadline.wrapping_add(self.dwell_ticks);
                self.phase = ScanPhase::Dwell(col);
                Some(ScanAction::Drive {
                    col,
                    deadline: self.deadline,
                })
            }
            ScanPhase::Dwell(col) if channel == col => {
                self.deadline = self.deadline.wrapping_add(self.dead_ticks);
                self.phase = ScanPhase::Gap(col.next());
                Some(ScanAction::Sample {
                    col,
                    deadline: self.deadline,
                })
            }
            _ => None,
        }
    }

    /// Counter overflow hook.
    ///
    /// Returns true when no compare fired during the whole wrapped period,
    /// meaning the schedule stalled (interrupts masked too long) and any
    /// outstanding deadline is ambiguous by a full counter range.
    pub fn on_overflow(&mut self) -> bool {
        let stalled = !self.compare_seen;
        self.compare_seen = false;
        stalled
    }

    /// Column currently driven, None during a gap
    pub const fn active_column(&self) -> Option<Column> {
        match self.phase {
            ScanPhase::Dwell(col) => Some(col),
            ScanPhase::Gap(_) => None,
        }
    }

    pub const fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Deadline of the next phase transition (absolute counter value)
    pub const fn deadline(&self) -> u16 {
        self.deadline
    }
}

/// Complete keypad input path: rotation, pins and debounce behind one
/// interrupt-facing surface.
///
/// The compare interrupt calls [`on_compare`](Keypad::on_compare) with the
/// fired channel and writes the returned deadline to the returned channel's
/// comparator. The overflow interrupt calls
/// [`on_overflow`](Keypad::on_overflow).
pub struct Keypad<C: ColumnDrive, R: RowSense> {
    scan: ScanState,
    debounce: Debouncer,
    cols: C,
    rows: R,
}

impl<C: ColumnDrive, R: RowSense> Keypad<C, R> {
    pub fn new(cols: C, rows: R, dwell_ticks: u16, dead_ticks: u16, debounce_ticks: u16) -> Self {
        Self {
            scan: ScanState::new(dwell_ticks, dead_ticks),
            debounce: Debouncer::new(debounce_ticks),
            cols,
            rows,
        }
    }

    /// Release every column line and arm the rotation at counter value
    /// `now`. Returns the initial deadline for each column's comparator.
    pub fn start(&mut self, now: u16) -> [u16; 3] {
        self.cols.release_all();
        self.scan.start(now)
    }

    /// Handle a compare event on `channel`.
    ///
    /// Returns the channel to rearm and its deadline, or None when the
    /// compare was stale. Samples taken here are timestamped with the
    /// scheduled deadline, not a re-read counter.
    pub fn on_compare(&mut self, channel: Column, mailbox: &KeyMailbox) -> Option<(Column, u16)> {
        let at = self.scan.deadline();
        match self.scan.on_compare(channel)? {
            ScanAction::Drive { col, deadline } => {
                self.cols.activate(col);
                Some((col, deadline))
            }
            ScanAction::Sample { col, deadline } => {
                let sample = self.rows.sample();
                self.debounce.feed(col, sample, at, mailbox);
                self.cols.release(col);
                Some((col.next(), deadline))
            }
        }
    }

    /// Handle a counter overflow. On a stall every debounce holdoff is
    /// dropped; the compare chain itself needs no repair because the stale
    /// comparator values come back around with the counter.
    pub fn on_overflow(&mut self) {
        if self.scan.on_overflow() {
            #[cfg(feature = "defmt")]
            defmt::warn!("scan stall: clearing debounce holdoffs");
            self.debounce.force_expire();
        }
    }

    /// Last accepted logical state of a key
    pub fn key_pressed(&self, key: KeyPos) -> bool {
        self.debounce.is_pressed(key)
    }

    /// Column currently driven, None during a gap
    pub fn active_column(&self) -> Option<Column> {
        self.scan.active_column()
    }

    pub fn phase(&self) -> ScanPhase {
        self.scan.phase()
    }
}
