//! Playback state machine driven by the periodic sequencer tick

use portable_atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use crate::hal::ToneOutput;
use crate::song::Song;
use crate::types::STEP_COUNT;

/// Playback control block shared between the tick interrupt and the main
/// loop.
///
/// The tick context owns head and tick-counter mutation. The main loop only
/// flips the playing flag through [`pause`](Playback::pause) and
/// [`resume`](Playback::resume) and reads the rest for rendering. Pausing
/// freezes both counters in place, so resuming continues mid-count rather
/// than restarting the step.
pub struct Playback {
    playing: AtomicBool,
    head: AtomicU8,
    ticks: AtomicU16,
}

impl Playback {
    /// Control block in the paused state with the head on step 0
    pub const fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            head: AtomicU8::new(0),
            ticks: AtomicU16::new(0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Current play-head step (0..20)
    pub fn head(&self) -> u8 {
        self.head.load(Ordering::Relaxed)
    }

    /// Ticks accumulated toward the next advance
    pub fn tick_count(&self) -> u16 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Periodic sequencer tick; runs in interrupt context.
    ///
    /// While playing, counts firings and on reaching `ticks_per_step`
    /// advances the play-head one step (wrapping 19 -> 0) and reprograms
    /// the tone from the new slot. Empty slots silence the output, filled
    /// slots play a square wave at exactly half the period. A zero
    /// threshold is treated as 1. Returns true when the head advanced.
    pub fn on_tick<T: ToneOutput>(&self, song: &Song, ticks_per_step: u16, tone: &mut T) -> bool {
        if !self.is_playing() {
            return false;
        }
        let count = self.ticks.load(Ordering::Relaxed).wrapping_add(1);
        if count < ticks_per_step.max(1) {
            self.ticks.store(count, Ordering::Relaxed);
            return false;
        }
        self.ticks.store(0, Ordering::Relaxed);
        let head = (self.head.load(Ordering::Relaxed) + 1) % STEP_COUNT as u8;
        self.head.store(head, Ordering::Relaxed);
        self.apply_slot(song, head, tone);
        true
    }

    /// Stop playback without disturbing position.
    ///
    /// Clears the playing flag first, which gates any tick still in
    /// flight, then silences the tone. The caller stops the periodic tick
    /// source afterwards. Head and tick counter keep their values.
    pub fn pause<T: ToneOutput>(&self, tone: &mut T) {
        self.playing.store(false, Ordering::Release);
        tone.disable();
    }

    /// Continue playback exactly where [`pause`](Playback::pause) left it.
    ///
    /// Reprograms the tone for the slot under the frozen head, then raises
    /// the playing flag. The caller restarts the tick source before this,
    /// which is harmless: ticks arriving early are gated by the flag.
    pub fn resume<T: ToneOutput>(&self, song: &Song, tone: &mut T) {
        self.apply_slot(song, self.head(), tone);
        self.playing.store(true, Ordering::Release);
    }

    fn apply_slot<T: ToneOutput>(&self, song: &Song, head: u8, tone: &mut T) {
        match song.pitch_at(head) {
            Some(pitch) => {
                let period = pitch.period_ticks();
                tone.set_tone(period, period / 2);
            }
            None => tone.disable(),
        }
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}
