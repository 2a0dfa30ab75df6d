//! Error types for the expander, sensor, and validated-input layers.
//!
//! Every failure that the block-programming surface used to swallow (an
//! out-of-range port, a checksum mismatch, a sensor that never answers) is a
//! variant here. The hardware error type `E` is whatever the underlying
//! `embedded-hal` implementation reports.

use core::fmt;

// ============================================================================
// Range Errors
// ============================================================================

/// A value was rejected by a validated constructor.
///
/// Produced by [`Channel::new`](crate::Channel::new),
/// [`MotorPort::new`](crate::MotorPort::new),
/// [`ServoPort::new`](crate::ServoPort::new),
/// [`ServoAngle::new`](crate::ServoAngle::new),
/// [`DutyCycle::new`](crate::DutyCycle::new) and frequency validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeError {
    /// What was being validated (e.g. `"motor port"`).
    pub what: &'static str,
    /// The rejected value.
    pub value: i32,
    /// Smallest accepted value.
    pub min: i32,
    /// Largest accepted value.
    pub max: i32,
}

impl RangeError {
    /// Creates a new range error.
    pub const fn new(what: &'static str, value: i32, min: i32, max: i32) -> Self {
        Self {
            what,
            value,
            min,
            max,
        }
    }

    /// Validates `value` against `min..=max`.
    pub(crate) fn check(what: &'static str, value: i32, min: i32, max: i32) -> Result<i32, Self> {
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(Self::new(what, value, min, max))
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} out of range ({}..={})",
            self.what, self.value, self.min, self.max
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RangeError {}

// ============================================================================
// PWM Expander Errors
// ============================================================================

/// Errors from the PCA9685 expander and the actuators driven through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PwmError<E> {
    /// The I2C transaction failed.
    Bus(E),
    /// A port, channel, angle, or frequency was outside its valid range.
    ///
    /// No bus traffic is generated when this is returned.
    OutOfRange(RangeError),
}

impl<E> From<RangeError> for PwmError<E> {
    fn from(e: RangeError) -> Self {
        Self::OutOfRange(e)
    }
}

impl<E: fmt::Debug> fmt::Display for PwmError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "i2c bus error: {e:?}"),
            Self::OutOfRange(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for PwmError<E> {}

// ============================================================================
// DHT Sensor Errors
// ============================================================================

/// Errors from a DHT11/DHT22 read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// Driving or sampling the data pin failed.
    Pin(E),
    /// The sensor never produced its low-then-high acknowledgment pulse.
    ///
    /// Usually a disconnected sensor or a missing pull-up.
    NoResponse,
    /// The line stopped toggling while bit `bit` (0-39) was being read.
    Timeout {
        /// Index of the bit being read when the deadline passed.
        bit: u8,
    },
    /// The checksum byte did not match the sum of the four data bytes.
    Checksum {
        /// Checksum byte sent by the sensor.
        expected: u8,
        /// Checksum computed from the received data bytes.
        computed: u8,
    },
}

impl<E: fmt::Debug> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(e) => write!(f, "data pin error: {e:?}"),
            Self::NoResponse => write!(f, "sensor not responding"),
            Self::Timeout { bit } => write!(f, "timed out reading bit {bit}"),
            Self::Checksum { expected, computed } => write!(
                f,
                "checksum mismatch (sensor sent {expected:#04x}, computed {computed:#04x})"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for DhtError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_accepts_bounds() {
        assert_eq!(RangeError::check("motor port", 1, 1, 4), Ok(1));
        assert_eq!(RangeError::check("motor port", 4, 1, 4), Ok(4));
    }

    #[test]
    fn range_check_rejects_outside() {
        let err = RangeError::check("motor port", 5, 1, 4).unwrap_err();
        assert_eq!(err, RangeError::new("motor port", 5, 1, 4));
        assert!(RangeError::check("motor port", 0, 1, 4).is_err());
    }

    #[test]
    fn range_error_display() {
        let err = RangeError::new("servo angle", 200, 0, 180);
        assert_eq!(err.to_string(), "servo angle 200 out of range (0..=180)");
    }

    #[test]
    fn pwm_error_from_range() {
        let err: PwmError<()> = RangeError::new("channel", 16, 0, 15).into();
        assert!(matches!(err, PwmError::OutOfRange(_)));
        assert_eq!(err.to_string(), "channel 16 out of range (0..=15)");
    }

    #[test]
    fn dht_error_display() {
        let err: DhtError<()> = DhtError::Checksum {
            expected: 0x2a,
            computed: 0x29,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch (sensor sent 0x2a, computed 0x29)"
        );
        assert_eq!(
            DhtError::<()>::NoResponse.to_string(),
            "sensor not responding"
        );
        assert_eq!(
            DhtError::<()>::Timeout { bit: 7 }.to_string(),
            "timed out reading bit 7"
        );
    }
}
