//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the bus, pins and time sources the
//! drivers use, so the whole kit can be exercised on a desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockI2c`] | [`I2c`] | Records writes, serves reads from a register file |
//! | [`MockTimer`] | [`Clock`] + [`DelayNs`] | Shared simulated time; delays advance it |
//! | [`MockDhtLine`] | [`InputPin`] + [`OutputPin`] | Replays a DHT waveform after the start signal |
//! | [`MockSonarBench`] | [`InputPin`] / [`OutputPin`] | Trigger/echo pair answering pings with scripted echoes |
//! | [`MockSonar`] | [`SonarRanger`] | Queued distances |
//!
//! Time only moves when something delays or polls: every pin read costs one
//! simulated microsecond, so bounded polling loops always terminate.
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::{SmartFarmKit, MotorPort};
//! use smartfarm_kit::config::Config;
//! use smartfarm_kit::hal::{MockI2c, MockTimer};
//!
//! let timer = MockTimer::new();
//! let mut kit = SmartFarmKit::new(MockI2c::new(), timer.clone(), timer, Config::default());
//!
//! kit.motor_run(MotorPort::M1A, 100).unwrap();
//!
//! // forward half (channel 0) at 1600, reverse half (channel 1) off
//! let writes = kit.expander().bus().writes();
//! let n = writes.len();
//! assert_eq!(writes[n - 2].1, vec![0x06, 0, 0, 0x40, 0x06]);
//! assert_eq!(writes[n - 1].1, vec![0x06 + 4, 0, 0, 0, 0]);
//! ```
//!
//! [`I2c`]: embedded_hal::i2c::I2c
//! [`DelayNs`]: embedded_hal::delay::DelayNs
//! [`InputPin`]: embedded_hal::digital::InputPin
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`Clock`]: crate::traits::Clock
//! [`SonarRanger`]: crate::traits::SonarRanger

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, I2c, Operation};

use crate::traits::{Clock, SonarRanger};

// ============================================================================
// Bus Mocks
// ============================================================================

/// Error returned by a [`MockI2c`] set to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockI2cError;

impl i2c::Error for MockI2cError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Mock I2C bus backed by a 256-byte register file.
///
/// Every write (including the address phase of `write_read`) is recorded as
/// `(address, bytes)`. The first byte of a write selects the register; the
/// rest are stored with auto-increment. Reads return bytes from the selected
/// register onwards. The address is recorded but not otherwise checked.
///
/// # Example
///
/// ```rust
/// use embedded_hal::i2c::I2c;
/// use smartfarm_kit::hal::MockI2c;
///
/// let mut bus = MockI2c::new();
/// bus.write(0x40, &[0x06, 1, 2]).unwrap();
/// assert_eq!(bus.register(0x07), 2);
///
/// let mut value = [0u8];
/// bus.write_read(0x40, &[0x06], &mut value).unwrap();
/// assert_eq!(value, [1]);
/// assert_eq!(bus.writes().len(), 2);
/// ```
#[derive(Debug)]
pub struct MockI2c {
    registers: [u8; 256],
    pointer: u8,
    writes: Vec<(u8, Vec<u8>)>,
    failing: bool,
}

impl MockI2c {
    /// Creates a bus with all registers zero.
    pub fn new() -> Self {
        Self {
            registers: [0; 256],
            pointer: 0,
            writes: Vec::new(),
            failing: false,
        }
    }

    /// Makes every transaction fail.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Turns failure injection on or off.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Recorded writes, oldest first.
    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    /// Forgets recorded writes. Register contents are kept.
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Current value of a register.
    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    /// Presets a register without recording a write.
    pub fn set_register(&mut self, register: u8, value: u8) {
        self.registers[register as usize] = value;
    }
}

impl Default for MockI2c {
    fn default() -> Self {
        Self::new()
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = MockI2cError;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.failing {
            return Err(MockI2cError);
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    self.writes.push((address, bytes.to_vec()));
                    if let Some((&register, data)) = bytes.split_first() {
                        self.pointer = register;
                        for &byte in data {
                            self.registers[self.pointer as usize] = byte;
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = self.registers[self.pointer as usize];
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Time Mocks
// ============================================================================

/// Simulated time shared between clones.
///
/// Implements [`Clock`] and [`DelayNs`]: a delay advances the shared time
/// instead of sleeping. Clone it to hand the same timeline to a driver's
/// delay and clock parameters and to the mock pins.
///
/// # Example
///
/// ```rust
/// use embedded_hal::delay::DelayNs;
/// use smartfarm_kit::hal::MockTimer;
/// use smartfarm_kit::traits::Clock;
///
/// let timer = MockTimer::new();
/// let mut delay = timer.clone();
/// delay.delay_ms(18);
/// assert_eq!(timer.now_us(), 18_000);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockTimer {
    now_ns: Rc<Cell<u64>>,
}

impl MockTimer {
    /// Creates a timer at 0 µs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward.
    pub fn advance_us(&self, us: u64) {
        self.now_ns.set(self.now_ns.get() + us * 1_000);
    }

    /// Jumps to an absolute time.
    pub fn set_us(&self, us: u64) {
        self.now_ns.set(us * 1_000);
    }
}

impl Clock for MockTimer {
    fn now_us(&self) -> u64 {
        self.now_ns.get() / 1_000
    }
}

impl DelayNs for MockTimer {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + ns as u64);
    }
}

// ============================================================================
// DHT Line Mock
// ============================================================================

/// Idle high after release, before the sensor pulls the line down (µs).
const DHT_RESPONSE_DELAY_US: u32 = 20;
const DHT_ACK_LOW_US: u32 = 80;
const DHT_ACK_HIGH_US: u32 = 80;
const DHT_BIT_LOW_US: u32 = 50;
const DHT_ZERO_HIGH_US: u32 = 27;
const DHT_ONE_HIGH_US: u32 = 70;

/// Open-drain DHT data line that replays a waveform.
///
/// Driving the line low and releasing it (writing high) is the start signal.
/// From the moment of release the line follows the scripted `(level, µs)`
/// segments, then idles high. Each read advances the shared [`MockTimer`]
/// by 1 µs.
#[derive(Debug)]
pub struct MockDhtLine {
    timer: MockTimer,
    waveform: Vec<(bool, u32)>,
    driven_low_since: Option<u64>,
    released_at: Option<u64>,
    start_signal_us: Option<u64>,
    /// Number of level reads so far.
    pub reads: usize,
}

impl MockDhtLine {
    /// A line that plays `waveform` after the start signal.
    pub fn with_waveform(timer: &MockTimer, waveform: Vec<(bool, u32)>) -> Self {
        Self {
            timer: timer.clone(),
            waveform,
            driven_low_since: None,
            released_at: None,
            start_signal_us: None,
            reads: 0,
        }
    }

    /// A sensor that answers with these five bytes using datasheet timing.
    pub fn responding(timer: &MockTimer, bytes: [u8; 5]) -> Self {
        let mut waveform = Self::frames(bytes, 40);
        waveform.push((false, DHT_BIT_LOW_US));
        Self::with_waveform(timer, waveform)
    }

    /// A sensor that stops transmitting after `bits` data bits.
    pub fn truncated(timer: &MockTimer, bytes: [u8; 5], bits: usize) -> Self {
        Self::with_waveform(timer, Self::frames(bytes, bits.min(40)))
    }

    /// Nothing connected: the pull-up keeps the line high.
    pub fn silent(timer: &MockTimer) -> Self {
        Self::with_waveform(timer, Vec::new())
    }

    /// A line shorted to ground.
    pub fn stuck_low(timer: &MockTimer) -> Self {
        Self::with_waveform(timer, Vec::from([(false, u32::MAX)]))
    }

    /// How long the last start signal held the line low.
    pub fn start_signal_us(&self) -> Option<u64> {
        self.start_signal_us
    }

    fn frames(bytes: [u8; 5], bits: usize) -> Vec<(bool, u32)> {
        let mut waveform = Vec::from([
            (true, DHT_RESPONSE_DELAY_US),
            (false, DHT_ACK_LOW_US),
            (true, DHT_ACK_HIGH_US),
        ]);
        for i in 0..bits {
            let one = bytes[i / 8] & (0x80 >> (i % 8)) != 0;
            waveform.push((false, DHT_BIT_LOW_US));
            waveform.push((true, if one { DHT_ONE_HIGH_US } else { DHT_ZERO_HIGH_US }));
        }
        waveform
    }

    fn level(&mut self) -> bool {
        self.timer.advance_us(1);
        self.reads += 1;

        if self.driven_low_since.is_some() {
            return false;
        }
        let Some(released) = self.released_at else {
            return true;
        };
        let mut t = self.timer.now_us() - released;
        for &(level, duration) in &self.waveform {
            if t < duration as u64 {
                return level;
            }
            t -= duration as u64;
        }
        true
    }
}

impl digital::ErrorType for MockDhtLine {
    type Error = Infallible;
}

impl OutputPin for MockDhtLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.driven_low_since = Some(self.timer.now_us());
        self.released_at = None;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if let Some(since) = self.driven_low_since.take() {
            let now = self.timer.now_us();
            self.start_signal_us = Some(now - since);
            self.released_at = Some(now);
        }
        Ok(())
    }
}

impl InputPin for MockDhtLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

// ============================================================================
// Sonar Mocks
// ============================================================================

/// Delay between the trigger falling edge and the echo rising (µs).
const SONAR_ECHO_LATENCY_US: u64 = 200;

#[derive(Debug, Default)]
struct SonarBenchState {
    echoes: VecDeque<Option<u64>>,
    window: Option<(u64, u64)>,
    trigger_high_since: Option<u64>,
    last_trigger_pulse_us: Option<u64>,
    pings: usize,
}

/// An HC-SR04 on the bench: hands out a linked trigger and echo pin.
///
/// Each trigger pulse (high then low) consumes one queued echo and raises
/// the echo pin for that many microseconds, shortly after the falling edge.
/// An empty queue behaves like [`queue_silence`](Self::queue_silence).
#[derive(Clone, Debug)]
pub struct MockSonarBench {
    timer: MockTimer,
    state: Rc<RefCell<SonarBenchState>>,
}

impl MockSonarBench {
    /// Creates a bench on the given timeline.
    pub fn new(timer: &MockTimer) -> Self {
        Self {
            timer: timer.clone(),
            state: Rc::new(RefCell::new(SonarBenchState::default())),
        }
    }

    /// Queues an echo pulse of `us` microseconds.
    pub fn queue_echo_us(&self, us: u64) {
        self.state.borrow_mut().echoes.push_back(Some(us));
    }

    /// Queues an echo for an object at `cm` centimeters.
    pub fn queue_distance_cm(&self, cm: u32) {
        self.queue_echo_us(cm as u64 * 58 + 29);
    }

    /// Queues a ping that gets no echo.
    pub fn queue_silence(&self) {
        self.state.borrow_mut().echoes.push_back(None);
    }

    /// Number of trigger pulses seen.
    pub fn pings(&self) -> usize {
        self.state.borrow().pings
    }

    /// Width of the last trigger pulse.
    pub fn last_trigger_pulse_us(&self) -> Option<u64> {
        self.state.borrow().last_trigger_pulse_us
    }

    /// The trigger pin.
    pub fn trigger(&self) -> MockTrigger {
        MockTrigger {
            bench: self.clone(),
        }
    }

    /// The echo pin.
    pub fn echo(&self) -> MockEcho {
        MockEcho {
            bench: self.clone(),
        }
    }
}

/// Trigger pin of a [`MockSonarBench`].
#[derive(Debug)]
pub struct MockTrigger {
    bench: MockSonarBench,
}

impl digital::ErrorType for MockTrigger {
    type Error = Infallible;
}

impl OutputPin for MockTrigger {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let now = self.bench.timer.now_us();
        let mut state = self.bench.state.borrow_mut();
        if let Some(since) = state.trigger_high_since.take() {
            state.last_trigger_pulse_us = Some(now - since);
            state.pings += 1;
            let start = now + SONAR_ECHO_LATENCY_US;
            state.window = state
                .echoes
                .pop_front()
                .flatten()
                .map(|width| (start, start + width));
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let now = self.bench.timer.now_us();
        self.bench.state.borrow_mut().trigger_high_since = Some(now);
        Ok(())
    }
}

/// Echo pin of a [`MockSonarBench`]. Each read advances time by 1 µs.
#[derive(Debug)]
pub struct MockEcho {
    bench: MockSonarBench,
}

impl MockEcho {
    fn level(&self) -> bool {
        self.bench.timer.advance_us(1);
        let now = self.bench.timer.now_us();
        match self.bench.state.borrow().window {
            Some((start, end)) => now >= start && now < end,
            None => false,
        }
    }
}

impl digital::ErrorType for MockEcho {
    type Error = Infallible;
}

impl InputPin for MockEcho {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

/// Range finder that replays queued distances.
///
/// Returns 0 (no echo) once the queue is empty.
///
/// # Example
///
/// ```rust
/// use smartfarm_kit::hal::MockSonar;
/// use smartfarm_kit::traits::SonarRanger;
///
/// let mut sonar = MockSonar::new();
/// sonar.queue_distances(&[12, 30]);
/// assert_eq!(sonar.ping_cm().unwrap(), 12);
/// assert_eq!(sonar.ping_cm().unwrap(), 30);
/// assert_eq!(sonar.ping_cm().unwrap(), 0); // Empty
/// assert_eq!(sonar.pings, 3);
/// ```
#[derive(Debug, Default)]
pub struct MockSonar {
    distances: VecDeque<u32>,
    /// Number of pings so far.
    pub pings: usize,
}

impl MockSonar {
    /// Creates a sonar with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one reading.
    pub fn queue_distance(&mut self, cm: u32) {
        self.distances.push_back(cm);
    }

    /// Queues several readings.
    pub fn queue_distances(&mut self, cms: &[u32]) {
        self.distances.extend(cms.iter().copied());
    }
}

impl SonarRanger for MockSonar {
    type Error = Infallible;

    fn ping_cm(&mut self) -> Result<u32, Self::Error> {
        self.pings += 1;
        Ok(self.distances.pop_front().unwrap_or(0))
    }
}

// ============================================================================
// Tests
// ============================================================================
