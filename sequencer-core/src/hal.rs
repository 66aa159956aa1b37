//! Hardware Abstraction Layer for the sequencer peripherals

// Re-export time types based on feature
#[cfg(feature = "embassy-time")]
pub use embassy_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
pub use self::mock_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
mod mock_time {
    /// Mock instant type for compilation without embassy-time
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub struct Instant(u64);

    impl Instant {
        pub fn now() -> Self {
            Self(0) // Placeholder implementation
        }

        pub fn from_millis(ms: i64) -> Self {
            Self(ms as u64)
        }

        pub fn duration_since(&self, other: Instant) -> Duration {
            Duration::from_millis(self.0.saturating_sub(other.0))
        }

        pub fn as_millis(&self) -> u64 {
            self.0
        }
    }

    /// Mock duration type, microsecond resolution
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub struct Duration(u64);

    impl Duration {
        pub fn from_millis(ms: u64) -> Self {
            Self(ms * 1000)
        }

        pub fn from_micros(us: u64) -> Self {
            Self(us)
        }

        pub fn as_millis(&self) -> u64 {
            self.0 / 1000
        }

        pub fn as_micros(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add for Duration {
        type Output = Duration;

        fn add(self, rhs: Duration) -> Duration {
            Duration(self.0 + rhs.0)
        }
    }

    impl core::ops::Div<u32> for Duration {
        type Output = Duration;

        fn div(self, rhs: u32) -> Duration {
            Duration(self.0 / rhs as u64)
        }
    }

    impl core::ops::Mul<u32> for Duration {
        type Output = Duration;

        fn mul(self, rhs: u32) -> Duration {
            Duration(self.0 * rhs as u64)
        }
    }
}

use embedded_hal::digital::{InputPin, OutputPin};

use crate::types::{Column, Row, RowSample};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Timer configuration failed
    TimerError,
    /// ADC setup or calibration failed
    AdcError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::TimerError => write!(f, "Timer configuration failed"),
            HalError::AdcError => write!(f, "ADC setup or calibration failed"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Column drive lines of the keypad matrix.
///
/// Called from the scan interrupt, so the methods are infallible; platform
/// GPIO writes either cannot fail or have nothing useful to do on failure.
pub trait ColumnDrive {
    /// Put `col` in its electrically active state
    fn activate(&mut self, col: Column);

    /// Return `col` to its inactive state
    fn release(&mut self, col: Column);

    /// Release every column line (startup and fail-safe)
    fn release_all(&mut self) {
        for col in Column::ALL {
            self.release(col);
        }
    }
}

/// Row sense lines of the keypad matrix
pub trait RowSense {
    /// Sample all three rows at once.
    ///
    /// Called at the end of a dwell while the column is still driven.
    fn sample(&mut self) -> RowSample;
}

/// Square-wave tone peripheral.
///
/// Values are integer ticks of the tone timer. Callers keep the duty at
/// exactly half the period.
pub trait ToneOutput {
    /// Program period and duty and enable the output stage
    fn set_tone(&mut self, period: u16, duty: u16);

    /// Disable the output stage; the peripheral may keep the last
    /// period and duty
    fn disable(&mut self);
}

/// Tempo feed for the sequencer tick.
///
/// Returns how many ticks make one play-head step. Must not block; an ADC
/// implementation reads the latest completed conversion.
pub trait TempoSource {
    fn ticks_per_step(&mut self) -> u16;
}

/// Tempo source with a fixed rate, for builds without a tempo knob
pub struct FixedTempo(pub u16);

impl TempoSource for FixedTempo {
    fn ticks_per_step(&mut self) -> u16 {
        self.0.max(1)
    }
}

/// Column driver over three embedded-hal output pins.
///
/// `active_low` selects the electrical polarity of the active state. Pin
/// errors are discarded; matrix drive lines are plain GPIO and their write
/// cannot fail on real hardware.
pub struct PinColumns<P> {
    pins: [P; 3],
    active_low: bool,
}

impl<P> PinColumns<P>
where
    P: OutputPin,
{
    pub fn new(pins: [P; 3], active_low: bool) -> Self {
        Self { pins, active_low }
    }

    /// Consume the driver and return the pins
    pub fn release_pins(self) -> [P; 3] {
        self.pins
    }
}

impl<P> ColumnDrive for PinColumns<P>
where
    P: OutputPin,
{
    fn activate(&mut self, col: Column) {
        let pin = &mut self.pins[col.index()];
        if self.active_low {
            pin.set_low().ok();
        } else {
            pin.set_high().ok();
        }
    }

    fn release(&mut self, col: Column) {
        let pin = &mut self.pins[col.index()];
        if self.active_low {
            pin.set_high().ok();
        } else {
            pin.set_low().ok();
        }
    }
}

/// Row reader over three embedded-hal input pins.
///
/// With `active_low` the rows idle high on pull-ups and a closed key reads
/// low. A pin read error counts as an open key.
pub struct PinRows<P> {
    pins: [P; 3],
    active_low: bool,
}

impl<P> PinRows<P>
where
    P: InputPin,
{
    pub fn new(pins: [P; 3], active_low: bool) -> Self {
        Self { pins, active_low }
    }

    /// Consume the reader and return the pins
    pub fn release_pins(self) -> [P; 3] {
        self.pins
    }
}

impl<P> RowSense for PinRows<P>
where
    P: InputPin,
{
    fn sample(&mut self) -> RowSample {
        let mut bits = 0u8;
        for row in Row::ALL {
            let pin = &mut self.pins[row.index()];
            let closed = if self.active_low {
                pin.is_low()
            } else {
                pin.is_high()
            };
            if closed.unwrap_or(false) {
                bits |= 1 << row.index();
            }
        }
        RowSample::new(bits)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;

    /// One recorded call to a [`ToneOutput`]
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub enum ToneCommand {
        Set { period: u16, duty: u16 },
        Disable,
    }

    /// Tone peripheral that records programming instead of making sound
    #[derive(Default)]
    pub struct MockTone {
        current: Option<(u16, u16)>,
        enabled: bool,
        history: heapless::Vec<ToneCommand, 64>,
    }

    impl MockTone {
        pub fn new() -> Self {
            Self::default()
        }

        /// Last programmed (period, duty), kept across disable
        pub fn current(&self) -> Option<(u16, u16)> {
            self.current
        }

        pub fn is_enabled(&self) -> bool {
            self.enabled
        }

        /// Every call in order; recording stops when the buffer fills
        pub fn history(&self) -> &[ToneCommand] {
            &self.history
        }

        pub fn clear_history(&mut self) {
            self.history.clear();
        }
    }

    impl ToneOutput for MockTone {
        fn set_tone(&mut self, period: u16, duty: u16) {
            self.current = Some((period, duty));
            self.enabled = true;
            self.history.push(ToneCommand::Set { period, duty }).ok();
        }

        fn disable(&mut self) {
            self.enabled = false;
            self.history.push(ToneCommand::Disable).ok();
        }
    }
}
