#![no_std]
#![no_main]

// Logging support
#[cfg(feature = "defmt")]
use defmt::{debug, info, warn};
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

// Define simple logging macros when defmt is not available
#[cfg(not(feature = "defmt"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

// Core imports
use core::cell::RefCell;
use portable_atomic::{AtomicU32, Ordering};
use riscv_rt::entry;
#[cfg(feature = "defmt")]
use sequencer_core::hal::Instant;
use sequencer_core::hal::{ColumnDrive, HalError, RowSense, TempoSource, ToneOutput};
use sequencer_core::{
    Column, Command, Cursor, KeyMailbox, Keypad, Playback, RowSample, SeqConfig, Song,
};

// Critical section implementation for RISC-V
struct RiscvCriticalSection;
critical_section::set_impl!(RiscvCriticalSection);

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus = riscv::register::mstatus::read();
        riscv::register::mstatus::clear_mie();
        mstatus.mie() as u8
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled != 0 {
            riscv::register::mstatus::set_mie();
        }
    }
}

// ========================================
// CH32V003 Hardware Definitions
// ========================================

/// CH32V003 Memory Map and Register Base Addresses
const RCC_BASE: u32 = 0x4002_1000;
const GPIOA_BASE: u32 = 0x4001_0800;
const GPIOC_BASE: u32 = 0x4001_1000;
const GPIOD_BASE: u32 = 0x4001_1400;
const ADC1_BASE: u32 = 0x4001_2400;
const TIM1_BASE: u32 = 0x4001_2C00;
const TIM2_BASE: u32 = 0x4000_0000;
const PFIC_BASE: u32 = 0xE000_E000; // Interrupt controller (WCH PFIC)
const SYSTICK_BASE: u32 = 0xE000_F000;

/// RCC Register offsets
const RCC_APB2PCENR: u32 = 0x18; // APB2 peripheral clock enable register
const RCC_APB1PCENR: u32 = 0x1C; // APB1 peripheral clock enable register

/// GPIO Register offsets
const GPIO_CFGLR: u32 = 0x00; // Port configuration register (pins 0-7)
const GPIO_INDR: u32 = 0x08;  // Input data register
const GPIO_BSHR: u32 = 0x10;  // Bit set/reset register

/// Timer register offsets (TIM1 advanced, TIM2 general purpose)
const TIM_CTLR1: u32 = 0x00;     // Control register 1
const TIM_DMAINTENR: u32 = 0x0C; // Interrupt enable register
const TIM_INTFR: u32 = 0x10;     // Interrupt flag register
const TIM_SWEVGR: u32 = 0x14;    // Software event generation register
const TIM_CHCTLR1: u32 = 0x18;   // Capture/compare mode register, channels 1-2
const TIM_CCER: u32 = 0x20;      // Capture/compare enable register
const TIM_CNT: u32 = 0x24;       // Counter
const TIM_PSC: u32 = 0x28;       // Prescaler
const TIM_ATRLR: u32 = 0x2C;     // Auto-reload register
const TIM_CH1CVR: u32 = 0x34;    // Channel 1 compare value
const TIM_CH2CVR: u32 = 0x38;    // Channel 2 compare value
const TIM_CH3CVR: u32 = 0x3C;    // Channel 3 compare value
const TIM_BDTR: u32 = 0x44;      // Break and dead-time register

/// ADC register offsets
const ADC_CTLR2: u32 = 0x08;   // Control register 2
const ADC_SAMPTR2: u32 = 0x10; // Sample time register, channels 0-9
const ADC_RSQR1: u32 = 0x2C;   // Regular sequence register 1
const ADC_RSQR3: u32 = 0x34;   // Regular sequence register 3
const ADC_RDATAR: u32 = 0x4C;  // Regular data register

/// SysTick (STK) register offsets
const STK_CTLR: u32 = 0x00;  // Control register
const STK_SR: u32 = 0x04;    // Status register
const STK_CNTL: u32 = 0x08;  // Counter
const STK_CMPLR: u32 = 0x10; // Compare

/// PFIC register offsets
const PFIC_IENR1: u32 = 0x100; // Interrupt enable, sources 0-31
const PFIC_IENR2: u32 = 0x104; // Interrupt enable, sources 32-63

/// System clock and derived timer rates
const HCLK_HZ: u32 = 24_000_000;
const SCAN_TIMER_HZ: u32 = 250_000;
const TONE_TIMER_HZ: u32 = 1_000_000;
const SYSTICK_RELOAD: u32 = HCLK_HZ / 1_000 - 1; // 1 kHz sequencer tick

// ========================================
// Shared State
// ========================================

/// Millisecond counter, driven by the SysTick interrupt while playing
static SYSTEM_TICK_MS: AtomicU32 = AtomicU32::new(0);

/// Debounced key presses, scan interrupt to main loop
static MAILBOX: KeyMailbox = KeyMailbox::new();

/// The note grid, shared between the main loop and the tick interrupt
static SONG: Song = Song::new();

/// Transport state and play head
static PLAYBACK: Playback = Playback::new();

/// Matrix scanner, owned by the TIM2 interrupt once armed
static KEYPAD: critical_section::Mutex<RefCell<Option<Keypad<ColumnPins, RowPins>>>> =
    critical_section::Mutex::new(RefCell::new(None));

// ========================================
// Peripheral Bindings
// ========================================

// Pin assignments:
// PC0-PC2 = matrix columns (open-drain, sink low when driven)
// PC5-PC7 = matrix rows (inputs with pull-up, PC5 is the top lane)
// PA1     = tone output (TIM1_CH2)
// PA2     = tempo potentiometer (ADC channel 0)
// PD6     = status LED (active high)

/// Matrix column lines PC0-PC2.
///
/// Open-drain outputs: a released column floats high on the row pull-ups
/// and an active column sinks its line low, so two keys closed on one row
/// never short two driven lines together.
struct ColumnPins;

impl ColumnDrive for ColumnPins {
    fn activate(&mut self, col: Column) {
        // BSHR upper half clears the output latch, sinking the line
        unsafe {
            core::ptr::write_volatile(
                (GPIOC_BASE + GPIO_BSHR) as *mut u32,
                1 << (col.index() + 16),
            );
        }
    }

    fn release(&mut self, col: Column) {
        unsafe {
            core::ptr::write_volatile((GPIOC_BASE + GPIO_BSHR) as *mut u32, 1 << col.index());
        }
    }
}

/// Matrix row lines PC5-PC7, idle high on pull-ups
struct RowPins;

impl RowSense for RowPins {
    fn sample(&mut self) -> RowSample {
        let indr =
            unsafe { core::ptr::read_volatile((GPIOC_BASE + GPIO_INDR) as *const u32) };
        // A closed key pulls its row low through the driven column
        RowSample::new((!(indr >> 5) & 0x07) as u8)
    }
}

/// Square-wave voice on TIM1 channel 2 (PA1).
///
/// The timer runs at 1 MHz, so period and duty are programmed directly in
/// microseconds. Preload keeps reprogramming glitch-free; a new period
/// takes over at the next timer update.
struct TonePwm;

impl ToneOutput for TonePwm {
    fn set_tone(&mut self, period: u16, duty: u16) {
        if period == 0 {
            return;
        }
        unsafe {
            core::ptr::write_volatile((TIM1_BASE + TIM_ATRLR) as *mut u32, (period - 1) as u32);
            core::ptr::write_volatile((TIM1_BASE + TIM_CH2CVR) as *mut u32, duty as u32);
            let ccer = core::ptr::read_volatile((TIM1_BASE + TIM_CCER) as *const u32);
            core::ptr::write_volatile((TIM1_BASE + TIM_CCER) as *mut u32, ccer | (1 << 4)); // CC2E
        }
    }

    fn disable(&mut self) {
        unsafe {
            let ccer = core::ptr::read_volatile((TIM1_BASE + TIM_CCER) as *const u32);
            core::ptr::write_volatile((TIM1_BASE + TIM_CCER) as *mut u32, ccer & !(1 << 4));
        }
    }
}

/// Tempo potentiometer on PA2 (ADC channel 0).
///
/// The converter free-runs in continuous mode, so a read returns the
/// latest completed conversion without waiting. The 10-bit value maps
/// onto 50..=561 ticks per step.
struct AdcTempo;

impl TempoSource for AdcTempo {
    fn ticks_per_step(&mut self) -> u16 {
        let raw =
            unsafe { core::ptr::read_volatile((ADC1_BASE + ADC_RDATAR) as *const u32) } & 0x3FF;
        50 + (raw >> 1) as u16
    }
}

/// Status LED on PD6, lit while the transport runs
struct StatusLed;

impl StatusLed {
    fn on(&self) {
        unsafe { core::ptr::write_volatile((GPIOD_BASE + GPIO_BSHR) as *mut u32, 1 << 6) };
    }

    fn off(&self) {
        unsafe { core::ptr::write_volatile((GPIOD_BASE + GPIO_BSHR) as *mut u32, 1 << (6 + 16)) };
    }
}

// ========================================
// Helper Functions
// ========================================

/// Get current system time as Instant
#[cfg(feature = "defmt")]
fn get_current_instant() -> Instant {
    let ms = SYSTEM_TICK_MS.load(Ordering::Relaxed);
    Instant::from_millis(ms as u64)
}

/// TIM2 compare register backing a column's scan channel
const fn compare_register(col: Column) -> u32 {
    match col {
        Column::Col0 => TIM2_BASE + TIM_CH1CVR,
        Column::Col1 => TIM2_BASE + TIM_CH2CVR,
        Column::Col2 => TIM2_BASE + TIM_CH3CVR,
    }
}

/// Start the 1 kHz sequencer tick from a fresh count
fn systick_start() {
    unsafe {
        core::ptr::write_volatile((SYSTICK_BASE + STK_CNTL) as *mut u32, 0);
        core::ptr::write_volatile((SYSTICK_BASE + STK_SR) as *mut u32, 0);
        // STE | STIE | HCLK as source | auto-reload at compare
        core::ptr::write_volatile((SYSTICK_BASE + STK_CTLR) as *mut u32, 0xF);
    }
}

/// Halt the sequencer tick; the millisecond clock freezes while paused
fn systick_stop() {
    unsafe {
        core::ptr::write_volatile((SYSTICK_BASE + STK_CTLR) as *mut u32, 0);
    }
}

// ========================================
// Hardware Initialization
// ========================================

fn hardware_init() -> Result<(), HalError> {
    enable_peripheral_clocks();
    configure_gpio_pins();
    configure_scan_timer();
    configure_tone_pwm();
    configure_adc_tempo()?;
    configure_systick();
    enable_interrupt_lines();

    info!("✅ Hardware initialization complete");
    Ok(())
}

/// Enable required peripheral clocks
fn enable_peripheral_clocks() {
    unsafe {
        // Bit 2 = GPIOA, Bit 3 = GPIOC, Bit 4 = GPIOD, Bit 9 = ADC1, Bit 11 = TIM1
        let apb2 = (RCC_BASE + RCC_APB2PCENR) as *mut u32;
        let current = core::ptr::read_volatile(apb2);
        core::ptr::write_volatile(
            apb2,
            current | (1 << 2) | (1 << 3) | (1 << 4) | (1 << 9) | (1 << 11),
        );

        // Bit 0 = TIM2
        let apb1 = (RCC_BASE + RCC_APB1PCENR) as *mut u32;
        let current = core::ptr::read_volatile(apb1);
        core::ptr::write_volatile(apb1, current | 1);
    }
}

/// Configure GPIO pins for the matrix, tone, tempo pot and LED
fn configure_gpio_pins() {
    // PC0-PC2 open-drain outputs (columns), PC5-PC7 pull-up inputs (rows)
    unsafe {
        let gpioc_cfglr = (GPIOC_BASE + GPIO_CFGLR) as *mut u32;
        let mut cfg = core::ptr::read_volatile(gpioc_cfglr);
        for pin in 0..3 {
            cfg &= !(0xF << (pin * 4));
            cfg |= 0x6 << (pin * 4); // MODE=10 (2 MHz output), CNF=01 (open-drain)
        }
        for pin in 5..8 {
            cfg &= !(0xF << (pin * 4));
            cfg |= 0x8 << (pin * 4); // MODE=00 (input), CNF=10 (pull-up/down)
        }
        core::ptr::write_volatile(gpioc_cfglr, cfg);

        // Columns idle released (latch high floats the line), rows pull up
        core::ptr::write_volatile((GPIOC_BASE + GPIO_BSHR) as *mut u32, 0x07 | (0x07 << 5));
    }

    // PA1 alternate-function push-pull (TIM1_CH2), PA2 analog (ADC channel 0)
    unsafe {
        let gpioa_cfglr = (GPIOA_BASE + GPIO_CFGLR) as *mut u32;
        let mut cfg = core::ptr::read_volatile(gpioa_cfglr);
        cfg &= !(0xF << 4);
        cfg |= 0xB << 4; // MODE=11, CNF=10 (alternate function push-pull)
        cfg &= !(0xF << 8); // MODE=00, CNF=00 (analog input)
        core::ptr::write_volatile(gpioa_cfglr, cfg);
    }

    // PD6 push-pull output (status LED)
    unsafe {
        let gpiod_cfglr = (GPIOD_BASE + GPIO_CFGLR) as *mut u32;
        let mut cfg = core::ptr::read_volatile(gpiod_cfglr);
        cfg &= !(0xF << 24);
        cfg |= 0x3 << 24; // MODE=11 (output), CNF=00 (push-pull)
        core::ptr::write_volatile(gpiod_cfglr, cfg);
    }
}

/// Configure TIM2 as the free-running scan clock.
///
/// The counter runs over the full 16-bit range at 250 kHz. The three
/// compare channels pace the column rotation and the update interrupt
/// doubles as the stall failsafe.
fn configure_scan_timer() {
    unsafe {
        core::ptr::write_volatile((TIM2_BASE + TIM_PSC) as *mut u32, HCLK_HZ / SCAN_TIMER_HZ - 1);
        core::ptr::write_volatile((TIM2_BASE + TIM_ATRLR) as *mut u32, 0xFFFF);
        // Load the prescaler through a forced update, then drop the flag it set
        core::ptr::write_volatile((TIM2_BASE + TIM_SWEVGR) as *mut u32, 1);
        core::ptr::write_volatile((TIM2_BASE + TIM_INTFR) as *mut u32, 0);
        // Update + compare 1-3 interrupts
        core::ptr::write_volatile((TIM2_BASE + TIM_DMAINTENR) as *mut u32, 0xF);
        core::ptr::write_volatile((TIM2_BASE + TIM_CTLR1) as *mut u32, 1); // CEN
    }
}

/// Configure TIM1 channel 2 as the 1 MHz square-wave voice on PA1
fn configure_tone_pwm() {
    unsafe {
        core::ptr::write_volatile((TIM1_BASE + TIM_PSC) as *mut u32, HCLK_HZ / TONE_TIMER_HZ - 1);
        core::ptr::write_volatile((TIM1_BASE + TIM_ATRLR) as *mut u32, 1000);
        core::ptr::write_volatile((TIM1_BASE + TIM_CH2CVR) as *mut u32, 0);
        // Channel 2 PWM mode 1 with preload
        core::ptr::write_volatile((TIM1_BASE + TIM_CHCTLR1) as *mut u32, (0x6 << 12) | (1 << 11));
        // Output stage stays off until a note plays
        core::ptr::write_volatile((TIM1_BASE + TIM_CCER) as *mut u32, 0);
        // Advanced timer master output enable
        core::ptr::write_volatile((TIM1_BASE + TIM_BDTR) as *mut u32, 1 << 15);
        // Load the prescaler, then run with auto-reload preload
        core::ptr::write_volatile((TIM1_BASE + TIM_SWEVGR) as *mut u32, 1);
        core::ptr::write_volatile((TIM1_BASE + TIM_CTLR1) as *mut u32, (1 << 7) | 1); // ARPE | CEN
    }
}

/// Power up the ADC, run calibration and leave it free-running on channel 0.
///
/// The calibration waits are bounded; a stuck converter reports
/// `HalError::AdcError` instead of hanging the boot.
fn configure_adc_tempo() -> Result<(), HalError> {
    const ADON: u32 = 1 << 0;
    const CONT: u32 = 1 << 1;
    const CAL: u32 = 1 << 2;
    const RSTCAL: u32 = 1 << 3;
    const CAL_SPIN_LIMIT: u32 = 100_000;

    unsafe {
        let ctlr2 = (ADC1_BASE + ADC_CTLR2) as *mut u32;

        // Wake the converter and give it a moment before calibrating
        core::ptr::write_volatile(ctlr2, ADON);
        for _ in 0..1_000 {
            core::hint::spin_loop();
        }

        core::ptr::write_volatile(ctlr2, ADON | RSTCAL);
        let mut spins = 0u32;
        while core::ptr::read_volatile(ctlr2 as *const u32) & RSTCAL != 0 {
            spins += 1;
            if spins > CAL_SPIN_LIMIT {
                return Err(HalError::AdcError);
            }
        }

        core::ptr::write_volatile(ctlr2, ADON | CAL);
        spins = 0;
        while core::ptr::read_volatile(ctlr2 as *const u32) & CAL != 0 {
            spins += 1;
            if spins > CAL_SPIN_LIMIT {
                return Err(HalError::AdcError);
            }
        }

        // Longest sample time on channel 0, one conversion per sequence
        core::ptr::write_volatile((ADC1_BASE + ADC_SAMPTR2) as *mut u32, 0x7);
        core::ptr::write_volatile((ADC1_BASE + ADC_RSQR1) as *mut u32, 0);
        core::ptr::write_volatile((ADC1_BASE + ADC_RSQR3) as *mut u32, 0);

        // Continuous conversions; the tick handler just reads the latest
        core::ptr::write_volatile(ctlr2, ADON | CONT);
        core::ptr::write_volatile(ctlr2, ADON | CONT); // second ADON starts converting
    }
    Ok(())
}

/// Configure SysTick for the 1 kHz sequencer tick (started on demand)
fn configure_systick() {
    unsafe {
        core::ptr::write_volatile((SYSTICK_BASE + STK_CMPLR) as *mut u32, SYSTICK_RELOAD);
        core::ptr::write_volatile((SYSTICK_BASE + STK_CNTL) as *mut u32, 0);
        core::ptr::write_volatile((SYSTICK_BASE + STK_SR) as *mut u32, 0);
    }
}

/// Unmask the scan timer (source 38) and SysTick (source 12) in the PFIC.
/// IENR bits are write-one-to-enable, so plain stores are safe.
fn enable_interrupt_lines() {
    unsafe {
        core::ptr::write_volatile((PFIC_BASE + PFIC_IENR1) as *mut u32, 1 << 12);
        core::ptr::write_volatile((PFIC_BASE + PFIC_IENR2) as *mut u32, 1 << (38 - 32));
    }
}

/// Build the keypad, stow it for the scan interrupt and arm the three
/// compare channels from the live counter
fn arm_keypad(config: &SeqConfig) {
    let keypad = Keypad::new(
        ColumnPins,
        RowPins,
        config.dwell_ticks(SCAN_TIMER_HZ),
        config.dead_ticks(SCAN_TIMER_HZ),
        config.debounce_ticks(SCAN_TIMER_HZ),
    );

    critical_section::with(|cs| {
        let mut slot = KEYPAD.borrow(cs).borrow_mut();
        let keypad = slot.insert(keypad);
        let now =
            unsafe { core::ptr::read_volatile((TIM2_BASE + TIM_CNT) as *const u32) } as u16;
        let deadlines = keypad.start(now);
        for col in Column::ALL {
            unsafe {
                core::ptr::write_volatile(
                    compare_register(col) as *mut u32,
                    deadlines[col.index()] as u32,
                );
            }
        }
    });
}

// ========================================
// Main Application
// ========================================

/// Apply one debounced key to the edit cursor or the transport
fn dispatch_key(digit: u8, cursor: &mut Cursor) {
    let Some(command) = Command::from_digit(digit) else {
        debug!("🔇 key {} unassigned", digit);
        return;
    };

    match command {
        Command::Move(dir) => {
            if !cursor.shift(dir) {
                debug!("🧱 cursor at grid edge");
            }
        }
        Command::ToggleNote => {
            if let Some(pitch) = cursor.pitch() {
                if SONG.toggle(cursor.step, pitch) {
                    info!("🎹 step {}: note set", cursor.step);
                } else {
                    info!("🎹 step {}: note cleared", cursor.step);
                }
            }
        }
        Command::PlayPause => play_or_pause(),
        Command::ClearSong => {
            SONG.clear();
            info!("🧹 song cleared");
        }
    }
}

/// Toggle the transport. The tick source stops entirely while paused so
/// the part sleeps between key presses.
fn play_or_pause() {
    let mut tone = TonePwm;
    if PLAYBACK.is_playing() {
        PLAYBACK.pause(&mut tone);
        systick_stop();
        StatusLed.off();
        info!("⏸ paused at step {}", PLAYBACK.head());
    } else {
        // Tick source first; early ticks are gated until resume flips the flag
        systick_start();
        PLAYBACK.resume(&SONG, &mut tone);
        StatusLed.on();
        info!("▶ playing from step {}", PLAYBACK.head());
    }
}

/// Debug heartbeat (feature-gated)
#[cfg(feature = "defmt")]
fn heartbeat(last_heartbeat: &mut Instant) {
    let now = get_current_instant();
    if now.duration_since(*last_heartbeat).as_millis() >= 10_000 {
        info!(
            "💓 Heartbeat - playing: {}, head: {}, tempo: {} ticks/step",
            PLAYBACK.is_playing(),
            PLAYBACK.head(),
            AdcTempo.ticks_per_step(),
        );
        *last_heartbeat = now;
    }
}

#[cfg(not(feature = "defmt"))]
fn heartbeat(_last_heartbeat: &mut ()) {}

/// Main execution loop
fn main_loop() -> ! {
    let mut cursor = Cursor::new();

    #[cfg(feature = "defmt")]
    let mut last_heartbeat = get_current_instant();
    #[cfg(not(feature = "defmt"))]
    let mut last_heartbeat = ();

    info!("🚀 Main loop started");

    loop {
        while let Some(digit) = MAILBOX.take() {
            debug!("⌨ key {}", digit);
            dispatch_key(digit, &mut cursor);
        }

        heartbeat(&mut last_heartbeat);

        // Sleep until the next scan compare or sequencer tick
        unsafe { riscv::asm::wfi() };
    }
}

#[entry]
fn main() -> ! {
    let config = SeqConfig::default();

    if hardware_init().is_err() {
        // Tempo pot calibration failed; nothing sensible runs without it
        warn!("⚠ hardware init failed");
        loop {
            unsafe { riscv::asm::wfi() };
        }
    }

    arm_keypad(&config);

    // A fresh grid boots playing, silent until notes land
    systick_start();
    PLAYBACK.resume(&SONG, &mut TonePwm);
    StatusLed.on();

    unsafe { riscv::interrupt::enable() };

    info!("🚀 CH32V003 step sequencer");
    info!(
        "📊 scan {} Hz, dwell {} ticks, debounce {} ticks",
        SCAN_TIMER_HZ,
        config.dwell_ticks(SCAN_TIMER_HZ),
        config.debounce_ticks(SCAN_TIMER_HZ),
    );

    main_loop()
}

// ========================================
// Interrupt Handlers
// ========================================

/// SysTick interrupt: advance the millisecond clock and the play head
#[no_mangle]
extern "C" fn SysTick() {
    unsafe {
        // Drop the compare flag; hardware already reset the counter
        core::ptr::write_volatile((SYSTICK_BASE + STK_SR) as *mut u32, 0);
    }

    let current = SYSTEM_TICK_MS.load(Ordering::Relaxed);
    SYSTEM_TICK_MS.store(current.wrapping_add(1), Ordering::Release);

    let mut tone = TonePwm;
    let mut tempo = AdcTempo;
    if PLAYBACK.on_tick(&SONG, tempo.ticks_per_step(), &mut tone) {
        debug!("🎵 step {}", PLAYBACK.head());
    }
}

/// TIM2 interrupt: walk the scan rotation and rearm the compare chain
#[no_mangle]
extern "C" fn TIM2_IRQHandler() {
    let pending =
        unsafe { core::ptr::read_volatile((TIM2_BASE + TIM_INTFR) as *const u32) };
    // Write-zero-to-clear; drop only the flags handled below
    unsafe {
        core::ptr::write_volatile((TIM2_BASE + TIM_INTFR) as *mut u32, !(pending & 0xF));
    }

    critical_section::with(|cs| {
        if let Some(keypad) = KEYPAD.borrow(cs).borrow_mut().as_mut() {
            if pending & 1 != 0 {
                keypad.on_overflow();
            }
            for col in Column::ALL {
                if pending & (1 << (col.index() + 1)) != 0 {
                    if let Some((next, deadline)) = keypad.on_compare(col, &MAILBOX) {
                        unsafe {
                            core::ptr::write_volatile(
                                compare_register(next) as *mut u32,
                                deadline as u32,
                            );
                        }
                    }
                }
            }
        }
    });
}
