//! PCA9685 16-channel PWM expander driver.
//!
//! The kit drives every motor and servo through one PCA9685 on the I2C bus.
//! This module holds the register-level driver: single-register reads and
//! writes, the sleep/prescale/restart frequency sequence, and 5-byte
//! per-channel duty-cycle writes.
//!
//! # Initialization
//!
//! A [`Pca9685`] handle starts uninitialized. [`ensure_initialized`] runs the
//! reset sequence once (MODE1 = 0, program the configured frequency, zero all
//! channels) and is a no-op afterwards. [`Pca9685::init`] does the same at
//! construction time.
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::{Channel, DutyCycle};
//! use smartfarm_kit::config::PwmConfig;
//! use smartfarm_kit::hal::{MockI2c, MockTimer};
//! use smartfarm_kit::pca9685::{Pca9685, PRESCALE};
//!
//! let mut delay = MockTimer::new();
//! let mut pwm = Pca9685::init(MockI2c::new(), PwmConfig::default(), &mut delay).unwrap();
//! assert!(pwm.is_initialized());
//! assert_eq!(pwm.read_register(PRESCALE).unwrap(), 121);
//!
//! pwm.set_pwm(Channel::new(3).unwrap(), DutyCycle::pulse(2048)).unwrap();
//! ```
//!
//! [`ensure_initialized`]: Pca9685::ensure_initialized

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info};

use crate::config::{PrescaleRounding, PwmConfig};
use crate::error::{PwmError, RangeError};
use crate::ports::{Channel, DutyCycle, CHANNEL_COUNT};

/// Mode register 1.
pub const MODE1: u8 = 0x00;
/// Prescaler register.
pub const PRESCALE: u8 = 0xFE;
/// First duty-cycle register (channel 0, on-low byte).
pub const LED0_ON_L: u8 = 0x06;

/// MODE1 sleep bit.
const MODE1_SLEEP: u8 = 0x10;
/// MODE1 restart, auto-increment and all-call bits.
const MODE1_RESTART_AI: u8 = 0xA1;
/// Oscillator settling time after leaving sleep.
const OSC_SETTLE_US: u32 = 5_000;

/// PWM period in ticks.
const TICKS_PER_PERIOD: f32 = 4096.0;
/// Lowest output frequency the chip supports at 25 MHz.
pub const MIN_FREQUENCY_HZ: u16 = 24;
/// Highest output frequency the chip supports at 25 MHz.
pub const MAX_FREQUENCY_HZ: u16 = 1526;
/// Hardware floor for the prescale register.
const PRESCALE_MIN: f32 = 3.0;

/// Computes the prescale register value for an output frequency.
///
/// `oscillator_hz / 4096 / hz - 1`, truncated or rounded per `rounding`,
/// saturated to the register's 3-255 range.
///
/// # Examples
///
/// ```
/// use smartfarm_kit::config::PrescaleRounding;
/// use smartfarm_kit::pca9685::prescale_for;
///
/// assert_eq!(prescale_for(25_000_000, 50, PrescaleRounding::Truncate), Ok(121));
/// assert_eq!(prescale_for(25_000_000, 1000, PrescaleRounding::Nearest), Ok(5));
/// assert!(prescale_for(25_000_000, 10, PrescaleRounding::Truncate).is_err());
/// ```
pub fn prescale_for(
    oscillator_hz: u32,
    hz: u16,
    rounding: PrescaleRounding,
) -> Result<u8, RangeError> {
    RangeError::check(
        "frequency",
        hz as i32,
        MIN_FREQUENCY_HZ as i32,
        MAX_FREQUENCY_HZ as i32,
    )?;

    let exact = oscillator_hz as f32 / TICKS_PER_PERIOD / hz as f32 - 1.0;
    let value = match rounding {
        PrescaleRounding::Truncate => exact,
        PrescaleRounding::Nearest => exact + 0.5,
    };
    // float-to-int `as` truncates and saturates at 255
    Ok(value.max(PRESCALE_MIN) as u8)
}

/// Handle to a PCA9685 on an I2C bus.
///
/// Owns the bus. Use [`bus`](Self::bus) to inspect it or
/// [`release`](Self::release) to get it back.
pub struct Pca9685<I2C> {
    i2c: I2C,
    config: PwmConfig,
    initialized: bool,
}

impl<I2C: I2c> Pca9685<I2C> {
    /// Creates an uninitialized handle. No bus traffic is generated.
    pub fn new(i2c: I2C, config: PwmConfig) -> Self {
        Self {
            i2c,
            config,
            initialized: false,
        }
    }

    /// Creates a handle and runs the reset sequence.
    pub fn init<D: DelayNs>(
        i2c: I2C,
        config: PwmConfig,
        delay: &mut D,
    ) -> Result<Self, PwmError<I2C::Error>> {
        let mut pwm = Self::new(i2c, config);
        pwm.ensure_initialized(delay)?;
        Ok(pwm)
    }

    /// Returns true once the reset sequence has completed.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the configuration this handle was created with.
    pub fn config(&self) -> &PwmConfig {
        &self.config
    }

    /// Runs the reset sequence if it has not completed yet.
    ///
    /// Writes MODE1 = 0, programs the configured frequency and zeroes all
    /// 16 channels. A failure leaves the handle uninitialized so the next
    /// call retries.
    pub fn ensure_initialized<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<(), PwmError<I2C::Error>> {
        if self.initialized {
            return Ok(());
        }

        self.write_register(MODE1, 0x00)?;
        self.set_frequency(self.config.frequency_hz, delay)?;
        self.all_off()?;

        self.initialized = true;
        info!(
            "pca9685 @ {:#04x} initialized at {} Hz",
            self.config.address, self.config.frequency_hz
        );
        Ok(())
    }

    // ========================================================================
    // Register Access
    // ========================================================================

    /// Reads one register (address write followed by a one-byte read).
    pub fn read_register(&mut self, register: u8) -> Result<u8, PwmError<I2C::Error>> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.config.address, &[register], &mut value)
            .map_err(PwmError::Bus)?;
        Ok(value[0])
    }

    /// Writes one register.
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), PwmError<I2C::Error>> {
        self.i2c
            .write(self.config.address, &[register, value])
            .map_err(PwmError::Bus)
    }

    /// Writes up to four consecutive registers starting at `start` in one
    /// transaction.
    ///
    /// Relies on register auto-increment, which the frequency sequence
    /// enables.
    pub fn write_block(&mut self, start: u8, values: &[u8]) -> Result<(), PwmError<I2C::Error>> {
        let len = values.len();
        if len > 4 {
            return Err(RangeError::new("block length", len as i32, 0, 4).into());
        }
        let mut frame = [start, 0, 0, 0, 0];
        frame[1..=len].copy_from_slice(values);
        self.i2c
            .write(self.config.address, &frame[..=len])
            .map_err(PwmError::Bus)
    }

    // ========================================================================
    // Frequency
    // ========================================================================

    /// Programs the output frequency.
    ///
    /// The prescaler can only be written while the oscillator sleeps, so the
    /// sequence is: sleep, write prescale, restore MODE1, wait 5 ms for the
    /// oscillator, then restart with auto-increment enabled.
    pub fn set_frequency<D: DelayNs>(
        &mut self,
        hz: u16,
        delay: &mut D,
    ) -> Result<(), PwmError<I2C::Error>> {
        let prescale = prescale_for(self.config.oscillator_hz, hz, self.config.rounding)?;
        debug!("pca9685: {} Hz -> prescale {}", hz, prescale);

        let old_mode = self.read_register(MODE1)?;
        self.write_register(MODE1, (old_mode & 0x7F) | MODE1_SLEEP)?;
        self.write_register(PRESCALE, prescale)?;
        self.write_register(MODE1, old_mode)?;
        delay.delay_us(OSC_SETTLE_US);
        self.write_register(MODE1, old_mode | MODE1_RESTART_AI)
    }

    /// Reads back the prescale register.
    pub fn prescale(&mut self) -> Result<u8, PwmError<I2C::Error>> {
        self.read_register(PRESCALE)
    }

    // ========================================================================
    // Duty Cycle
    // ========================================================================

    /// Sets one channel's on/off ticks in a single 5-byte write.
    pub fn set_pwm(&mut self, channel: Channel, duty: DutyCycle) -> Result<(), PwmError<I2C::Error>> {
        self.write_block(LED0_ON_L + 4 * channel.index(), &duty.to_le_bytes())
    }

    /// Sets a channel from unvalidated numbers.
    ///
    /// Channels outside 0-15 are ignored and `Ok(false)` is returned without
    /// touching the bus; tick counts above 4095 are rejected.
    pub fn set_pwm_raw(
        &mut self,
        channel: i32,
        on: u16,
        off: u16,
    ) -> Result<bool, PwmError<I2C::Error>> {
        let Some(channel) = u8::try_from(channel).ok().and_then(|c| Channel::new(c).ok()) else {
            return Ok(false);
        };
        self.set_pwm(channel, DutyCycle::new(on, off)?)?;
        Ok(true)
    }

    /// Turns every channel off.
    pub fn all_off(&mut self) -> Result<(), PwmError<I2C::Error>> {
        for channel in Channel::all() {
            self.set_pwm(channel, DutyCycle::OFF)?;
        }
        debug!("pca9685: {} channels off", CHANNEL_COUNT);
        Ok(())
    }

    // ========================================================================
    // Bus Access
    // ========================================================================

    /// Borrows the underlying bus.
    pub fn bus(&self) -> &I2C {
        &self.i2c
    }

    /// Mutably borrows the underlying bus.
    pub fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Consumes the handle and returns the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}
