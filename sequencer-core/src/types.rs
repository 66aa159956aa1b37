//! Core data types for the step sequencer

use crate::hal::Duration;

/// Number of steps in the song grid
pub const STEP_COUNT: usize = 20;

/// Number of pitch rows in the song grid
pub const PITCH_COUNT: usize = 4;

/// Keypad matrix column count
pub const MATRIX_COLS: usize = 3;

/// Keypad matrix row count
pub const MATRIX_ROWS: usize = 3;

/// Keypad column drive lines, in scan rotation order
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
pub enum Column {
    /// First column (leftmost)
    Col0,
    /// Second column
    Col1,
    /// Third column (rightmost)
    Col2,
}

impl Column {
    /// All columns in rotation order
    pub const ALL: [Column; 3] = [Column::Col0, Column::Col1, Column::Col2];

    /// Successor in the scan rotation (wraps back to the first column)
    pub const fn next(&self) -> Column {
        match self {
            Column::Col0 => Column::Col1,
            Column::Col1 => Column::Col2,
            Column::Col2 => Column::Col0,
        }
    }

    /// Zero-based column index
    pub const fn index(&self) -> usize {
        match self {
            Column::Col0 => 0,
            Column::Col1 => 1,
            Column::Col2 => 2,
        }
    }
}

/// Keypad row sense lines
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
pub enum Row {
    /// Top row
    Row0,
    /// Middle row
    Row1,
    /// Bottom row
    Row2,
}

impl Row {
    /// All rows in sense order
    pub const ALL: [Row; 3] = [Row::Row0, Row::Row1, Row::Row2];

    /// Zero-based row index
    pub const fn index(&self) -> usize {
        match self {
            Row::Row0 => 0,
            Row::Row1 => 1,
            Row::Row2 => 2,
        }
    }
}

/// Physical key location in the 3x3 matrix
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct KeyPos {
    pub col: Column,
    pub row: Row,
}

impl KeyPos {
    pub const fn new(col: Column, row: Row) -> Self {
        Self { col, row }
    }

    /// ASCII digit code for this key, counted row-major from the top-left
    /// key ('1') to the bottom-right key ('9'). Zero is never a key code,
    /// which leaves it free as the mailbox empty sentinel.
    pub const fn digit(&self) -> u8 {
        b'1' + (self.row.index() * MATRIX_COLS + self.col.index()) as u8
    }
}

/// Raw row levels captured during one column dwell.
///
/// Bit `r` set means the key at (column, row `r`) read as closed while that
/// column was driven.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RowSample(u8);

impl RowSample {
    /// Sample with no rows active
    pub const IDLE: RowSample = RowSample(0);

    pub const fn new(bits: u8) -> Self {
        Self(bits & 0x07)
    }

    /// True when the key on `row` read closed
    pub const fn pressed(&self, row: Row) -> bool {
        self.0 >> row.index() & 1 != 0
    }

    /// True when any row read closed
    pub const fn any(&self) -> bool {
        self.0 != 0
    }

    /// Raw row bits (bits 0..=2)
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

/// Cursor movement directions on the song grid
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Main-loop commands, selected by key digit.
///
/// The assignment follows a phone-pad layout: the center key ('5') toggles
/// a note and the keys around it move the cursor. '1' and '3' are
/// unassigned and ignored.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Command {
    /// Move the edit cursor one cell
    Move(Direction),
    /// Toggle the note at the cursor ('5')
    ToggleNote,
    /// Start or pause playback ('7')
    PlayPause,
    /// Erase every step of the song ('9')
    ClearSong,
}

impl Command {
    /// Decode a key digit into a command, or None for unassigned keys
    pub const fn from_digit(digit: u8) -> Option<Command> {
        match digit {
            b'2' => Some(Command::Move(Direction::Up)),
            b'8' => Some(Command::Move(Direction::Down)),
            b'4' => Some(Command::Move(Direction::Left)),
            b'6' => Some(Command::Move(Direction::Right)),
            b'5' => Some(Command::ToggleNote),
            b'7' => Some(Command::PlayPause),
            b'9' => Some(Command::ClearSong),
            _ => None,
        }
    }
}

/// The four fixed pitches, one per grid row (row 0 is the highest)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
pub enum Pitch {
    /// 1046.5 Hz
    C6,
    /// 784.0 Hz
    G5,
    /// 659.3 Hz
    E5,
    /// 523.3 Hz
    C5,
}

impl Pitch {
    /// Tone period in ticks of the 1 MHz tone timer
    pub const fn period_ticks(&self) -> u16 {
        match self {
            Pitch::C6 => 956,
            Pitch::G5 => 1276,
            Pitch::E5 => 1517,
            Pitch::C5 => 1911,
        }
    }

    /// Storage code for song slots (1..=4; 0 marks an empty slot)
    pub const fn code(&self) -> u8 {
        match self {
            Pitch::C6 => 1,
            Pitch::G5 => 2,
            Pitch::E5 => 3,
            Pitch::C5 => 4,
        }
    }

    /// Decode a slot value, None for the empty sentinel or garbage
    pub const fn from_code(code: u8) -> Option<Pitch> {
        match code {
            1 => Some(Pitch::C6),
            2 => Some(Pitch::G5),
            3 => Some(Pitch::E5),
            4 => Some(Pitch::C5),
            _ => None,
        }
    }

    /// Pitch shown on a grid row (0 = top = highest pitch)
    pub const fn from_row(row: u8) -> Option<Pitch> {
        match row {
            0 => Some(Pitch::C6),
            1 => Some(Pitch::G5),
            2 => Some(Pitch::E5),
            3 => Some(Pitch::C5),
            _ => None,
        }
    }

    /// Grid row this pitch is shown on
    pub const fn row(&self) -> u8 {
        match self {
            Pitch::C6 => 0,
            Pitch::G5 => 1,
            Pitch::E5 => 2,
            Pitch::C5 => 3,
        }
    }
}

/// Sequencer configuration parameters
#[derive(Copy, Clone, Debug)]
pub struct SeqConfig {
    /// Time one column stays driven per scan slot
    pub dwell: Duration,
    /// Gap with no column driven between dwells
    pub dead_time: Duration,
    /// Per-key holdoff after an accepted transition
    pub debounce: Duration,
    /// Sequencer ticks per play-head advance when no tempo source is wired
    pub ticks_per_step: u16,
}

impl Default for SeqConfig {
    fn default() -> Self {
        Self {
            dwell: Duration::from_millis(4),
            dead_time: Duration::from_micros(500),
            debounce: Duration::from_millis(30),
            ticks_per_step: 125,
        }
    }
}

impl SeqConfig {
    /// Create a validated configuration
    pub fn new(
        dwell: Duration,
        dead_time: Duration,
        debounce: Duration,
        ticks_per_step: u16,
    ) -> Result<Self, &'static str> {
        if dwell.as_micros() == 0 || dwell.as_millis() > 100 {
            return Err("Dwell must be between 1us and 100ms");
        }
        if dead_time.as_micros() == 0 {
            return Err("Dead time must be nonzero");
        }
        if dead_time.as_micros() >= dwell.as_micros() {
            return Err("Dead time must be shorter than dwell");
        }
        if debounce.as_millis() > 100 {
            return Err("Debounce must be 100ms or less");
        }
        if ticks_per_step == 0 {
            return Err("Ticks per step must be at least 1");
        }
        Ok(Self {
            dwell,
            dead_time,
            debounce,
            ticks_per_step,
        })
    }

    /// Dwell expressed in scan timer ticks
    pub fn dwell_ticks(&self, timer_hz: u32) -> u16 {
        duration_to_ticks(self.dwell, timer_hz)
    }

    /// Dead time expressed in scan timer ticks
    pub fn dead_ticks(&self, timer_hz: u32) -> u16 {
        duration_to_ticks(self.dead_time, timer_hz)
    }

    /// Debounce holdoff expressed in scan timer ticks
    pub fn debounce_ticks(&self, timer_hz: u32) -> u16 {
        duration_to_ticks(self.debounce, timer_hz)
    }

    /// Length of one full rotation over all three columns
    pub fn scan_cycle(&self) -> Duration {
        (self.dwell + self.dead_time) * 3
    }
}

fn duration_to_ticks(d: Duration, timer_hz: u32) -> u16 {
    let ticks = d.as_micros() * timer_hz as u64 / 1_000_000;
    ticks.min(u16::MAX as u64) as u16
}
