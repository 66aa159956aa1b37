#![cfg_attr(not(feature = "std"), no_std)]

//! # Sequencer Core
//!
//! Step sequencer core logic library for embedded systems.
//! Covers the interrupt-driven keypad matrix scan, per-key debounce, the
//! single-slot key mailbox, the 20-step song grid and the playback tick.

pub mod types;
pub mod scan;
pub mod debounce;
pub mod mailbox;
pub mod song;
pub mod sequencer;
pub mod hal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use types::*;
pub use scan::*;
pub use debounce::*;
pub use mailbox::*;
pub use song::*;
pub use sequencer::*;
pub use hal::{*, Instant, Duration};

/// Sequencer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration for the reference 3x3 keypad hardware
pub fn default_config() -> SeqConfig {
    SeqConfig {
        dwell: Duration::from_millis(4),
        dead_time: Duration::from_micros(500), // settle gap between columns
        debounce: Duration::from_millis(30),
        ticks_per_step: 125, // 125 ms per step at the 1 kHz tick
    }
}
