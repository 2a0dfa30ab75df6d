//! Hardware abstraction traits that `embedded-hal` does not cover.
//!
//! I2C, GPIO and blocking delays come straight from `embedded-hal` 1.0
//! ([`I2c`](embedded_hal::i2c::I2c), [`InputPin`](embedded_hal::digital::InputPin),
//! [`OutputPin`](embedded_hal::digital::OutputPin),
//! [`DelayNs`](embedded_hal::delay::DelayNs)). This module adds the few seams
//! the kit needs on top of those.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Clock`] | Monotonic microsecond time for polling deadlines |
//! | [`SonarRanger`] | Ultrasonic distance measurement in centimeters |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::traits::SonarRanger;
//! use smartfarm_kit::hal::MockSonar;
//!
//! let mut sonar = MockSonar::new();
//! sonar.queue_distance(42);
//! assert_eq!(sonar.ping_cm().unwrap(), 42);
//! ```

/// Direction a motor is turning.
///
/// Derived from the sign of a motor speed. The kit has no separate direction
/// signal: direction is selected by which channel of the motor's pair carries
/// the PWM.
///
/// # Default
///
/// Defaults to [`Stopped`](Self::Stopped).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Positive speed; the first channel of the pair is driven.
    Forward,
    /// Negative speed; the second channel of the pair is driven.
    Reverse,
    /// Zero speed; both channels are off.
    #[default]
    Stopped,
}

impl Direction {
    /// Direction implied by a signed speed.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartfarm_kit::Direction;
    ///
    /// assert_eq!(Direction::from_speed(120), Direction::Forward);
    /// assert_eq!(Direction::from_speed(-1), Direction::Reverse);
    /// assert_eq!(Direction::from_speed(0), Direction::Stopped);
    /// ```
    #[inline]
    pub const fn from_speed(speed: i32) -> Self {
        if speed > 0 {
            Direction::Forward
        } else if speed < 0 {
            Direction::Reverse
        } else {
            Direction::Stopped
        }
    }

    /// Returns the direction as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
            Direction::Stopped => "stopped",
        }
    }
}

/// Monotonic time source with microsecond resolution.
///
/// Used for the bounded polling loops of the DHT and sonar protocols and for
/// measuring how long a decode took. On ESP32 this wraps
/// `esp_timer_get_time()`; in tests use [`MockTimer`](crate::hal::MockTimer).
///
/// # Example
///
/// ```rust
/// use smartfarm_kit::traits::Clock;
/// use smartfarm_kit::hal::MockTimer;
///
/// let timer = MockTimer::new();
/// assert_eq!(timer.now_us(), 0);
///
/// timer.advance_us(250);
/// assert_eq!(timer.now_us(), 250);
/// ```
pub trait Clock {
    /// Returns current time in microseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_us(&self) -> u64;

    /// Microseconds elapsed since `start` (a previous [`now_us`](Self::now_us)).
    fn elapsed_us(&self, start: u64) -> u64 {
        self.now_us().saturating_sub(start)
    }
}

/// Ultrasonic range finder.
///
/// The kit treats the sonar as a black box that returns a distance in whole
/// centimeters. A reading of `0` means no echo came back within range, which
/// is the convention of the block-programming `ping` primitive.
///
/// [`HcSr04`](crate::sonar::HcSr04) implements this for a trigger/echo pin
/// pair; [`MockSonar`](crate::hal::MockSonar) replays queued readings.
pub trait SonarRanger {
    /// Error type for a failed measurement.
    type Error;

    /// Fires one ping and returns the distance in centimeters (0 = no echo).
    fn ping_cm(&mut self) -> Result<u32, Self::Error>;
}

impl<T: SonarRanger + ?Sized> SonarRanger for &mut T {
    type Error = T::Error;

    fn ping_cm(&mut self) -> Result<u32, Self::Error> {
        T::ping_cm(self)
    }
}
