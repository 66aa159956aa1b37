//! Test utilities for sequencer core functionality

pub mod scan_harness {
    //! Deterministic replay of the scan compare chain
    //!
    //! Models the timer hardware around a [`Keypad`]: three comparator
    //! cells, fired in deadline order, each rearmed from the value the
    //! keypad hands back, plus the overflow interrupt at every counter
    //! wrap. Matrix state lives in shared cells so tests can close and
    //! open keys while the chain runs.

    use core::cell::Cell;

    use crate::hal::{ColumnDrive, RowSense};
    use crate::mailbox::KeyMailbox;
    use crate::scan::Keypad;
    use crate::types::{Column, Row, RowSample};

    /// Shared electrical state of the simulated matrix
    pub struct MatrixCells {
        driven: [Cell<bool>; 3],
        closed: [Cell<u8>; 3],
    }

    impl MatrixCells {
        pub const fn new() -> Self {
            const OFF: Cell<bool> = Cell::new(false);
            const OPEN: Cell<u8> = Cell::new(0);
            Self {
                driven: [OFF; 3],
                closed: [OPEN; 3],
            }
        }

        /// Close the key switch at (col, row)
        pub fn press(&self, col: Column, row: Row) {
            let cell = &self.closed[col.index()];
            cell.set(cell.get() | 1 << row.index());
        }

        /// Open the key switch at (col, row)
        pub fn release(&self, col: Column, row: Row) {
            let cell = &self.closed[col.index()];
            cell.set(cell.get() & !(1 << row.index()));
        }

        /// True while the column line is electrically driven
        pub fn is_driven(&self, col: Column) -> bool {
            self.driven[col.index()].get()
        }

        /// Number of simultaneously driven column lines
        pub fn driven_count(&self) -> usize {
            self.driven.iter().filter(|cell| cell.get()).count()
        }
    }

    impl Default for MatrixCells {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Column driver writing into the shared cells
    pub struct SimColumns<'a>(pub &'a MatrixCells);

    impl ColumnDrive for SimColumns<'_> {
        fn activate(&mut self, col: Column) {
            self.0.driven[col.index()].set(true);
        }

        fn release(&mut self, col: Column) {
            self.0.driven[col.index()].set(false);
        }
    }

    /// Row reader that sees closed keys on driven columns only
    pub struct SimRows<'a>(pub &'a MatrixCells);

    impl RowSense for SimRows<'_> {
        fn sample(&mut self) -> RowSample {
            let mut bits = 0;
            for col in Column::ALL {
                if self.0.driven[col.index()].get() {
                    bits |= self.0.closed[col.index()].get();
                }
            }
            RowSample::new(bits)
        }
    }

    /// Compare-chain replay around a keypad
    pub struct ScanSim<'a> {
        keypad: Keypad<SimColumns<'a>, SimRows<'a>>,
        ccr: [Option<u16>; 3],
        now: u16,
    }

    impl<'a> ScanSim<'a> {
        pub fn new(cells: &'a MatrixCells, dwell: u16, dead: u16, debounce: u16) -> Self {
            Self::new_at(cells, dwell, dead, debounce, 0)
        }

        /// Start the chain with the counter at `start`
        pub fn new_at(
            cells: &'a MatrixCells,
            dwell: u16,
            dead: u16,
            debounce: u16,
            start: u16,
        ) -> Self {
            let mut keypad = Keypad::new(SimColumns(cells), SimRows(cells), dwell, dead, debounce);
            let armed = keypad.start(start);
            Self {
                keypad,
                ccr: [Some(armed[0]), Some(armed[1]), Some(armed[2])],
                now: start,
            }
        }

        /// Current simulated counter value
        pub fn now(&self) -> u16 {
            self.now
        }

        pub fn keypad(&self) -> &Keypad<SimColumns<'a>, SimRows<'a>> {
            &self.keypad
        }

        /// Force an overflow interrupt without advancing the counter, as
        /// happens when compares were missed for a whole wrap
        pub fn fire_overflow(&mut self) {
            self.keypad.on_overflow();
        }

        fn earliest_armed(&self) -> (Column, u16) {
            let mut best: Option<(Column, u16, u16)> = None;
            for col in Column::ALL {
                if let Some(deadline) = self.ccr[col.index()] {
                    let dist = deadline.wrapping_sub(self.now);
                    let closer = match best {
                        Some((_, _, best_dist)) => dist < best_dist,
                        None => true,
                    };
                    if closer {
                        best = Some((col, deadline, dist));
                    }
                }
            }
            let (col, deadline, _) = best.expect("scan chain lost all armed channels");
            (col, deadline)
        }

        /// Advance to the earliest armed compare and fire it.
        ///
        /// Fires the overflow interrupt first when the counter wraps on
        /// the way there. Returns the channel that fired.
        pub fn step(&mut self, mailbox: &KeyMailbox) -> Column {
            let (channel, deadline) = self.earliest_armed();
            if deadline < self.now {
                // Counter crosses zero before reaching the deadline
                self.keypad.on_overflow();
            }
            self.now = deadline;
            self.ccr[channel.index()] = None;
            if let Some((arm, next)) = self.keypad.on_compare(channel, mailbox) {
                self.ccr[arm.index()] = Some(next);
            }
            channel
        }

        /// Fire compares until the next one would land past `until`
        /// (absolute counter value, wrapping)
        pub fn run_until(&mut self, until: u16, mailbox: &KeyMailbox) {
            loop {
                let (_, deadline) = self.earliest_armed();
                if deadline.wrapping_sub(self.now) > until.wrapping_sub(self.now) {
                    break;
                }
                self.step(mailbox);
            }
        }
    }

}
