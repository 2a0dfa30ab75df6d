//! Validated port, channel and duty-cycle types.
//!
//! The block-programming surface identifies motors as `M1A`..`M2B` and servos
//! as `S1`..`S8`. Out-of-range indices used to be dropped silently deep in the
//! driver; here they are rejected at construction with a [`RangeError`].
//!
//! # Channel Map
//!
//! | Port | Index | Expander channels |
//! |------|-------|-------------------|
//! | `M1A` | 1 | 0, 1 |
//! | `M1B` | 2 | 2, 3 |
//! | `M2A` | 3 | 4, 5 |
//! | `M2B` | 4 | 6, 7 |
//! | `S1`..`S8` | 1-8 | 8-15 (`index + 7`) |

use core::fmt;

use crate::error::RangeError;

/// Highest count in the expander's 4096-tick PWM period.
pub const MAX_TICKS: u16 = 4095;

/// Number of PWM outputs on the expander.
pub const CHANNEL_COUNT: u8 = 16;

// ============================================================================
// Channel
// ============================================================================

/// A PCA9685 output channel, 0-15.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel(u8);

impl Channel {
    /// Validates a channel number.
    pub fn new(channel: u8) -> Result<Self, RangeError> {
        RangeError::check("channel", channel as i32, 0, CHANNEL_COUNT as i32 - 1)?;
        Ok(Self(channel))
    }

    /// Returns the channel number.
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Iterates over all 16 channels in order.
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..CHANNEL_COUNT).map(Channel)
    }
}

impl TryFrom<u8> for Channel {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ============================================================================
// DutyCycle
// ============================================================================

/// On/off tick pair within the expander's 4096-tick period.
///
/// The output goes high at tick `on` and low at tick `off`. Both counts are
/// 12-bit (0-4095).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DutyCycle {
    on: u16,
    off: u16,
}

impl DutyCycle {
    /// Output permanently low.
    pub const OFF: Self = Self { on: 0, off: 0 };

    /// Validates an on/off pair.
    pub fn new(on: u16, off: u16) -> Result<Self, RangeError> {
        RangeError::check("on count", on as i32, 0, MAX_TICKS as i32)?;
        RangeError::check("off count", off as i32, 0, MAX_TICKS as i32)?;
        Ok(Self { on, off })
    }

    /// A pulse starting at tick 0 and ending at `off`, clamped to 4095.
    pub const fn pulse(off: u16) -> Self {
        let off = if off > MAX_TICKS { MAX_TICKS } else { off };
        Self { on: 0, off }
    }

    /// Tick at which the output turns on.
    #[inline]
    pub const fn on(self) -> u16 {
        self.on
    }

    /// Tick at which the output turns off.
    #[inline]
    pub const fn off(self) -> u16 {
        self.off
    }

    /// Register bytes in the order the expander expects them:
    /// on-low, on-high, off-low, off-high.
    pub const fn to_le_bytes(self) -> [u8; 4] {
        [
            (self.on & 0xFF) as u8,
            (self.on >> 8) as u8,
            (self.off & 0xFF) as u8,
            (self.off >> 8) as u8,
        ]
    }
}

// ============================================================================
// Motor Ports
// ============================================================================

/// One of the four DC motor outputs.
///
/// # Examples
///
/// ```
/// use smartfarm_kit::MotorPort;
///
/// let port = MotorPort::from_text("m2a").unwrap();
/// assert_eq!(port, MotorPort::M2A);
/// assert_eq!(port.index(), 3);
/// assert!(MotorPort::new(5).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorPort {
    /// Motor output 1 (channels 0 and 1).
    M1A = 1,
    /// Motor output 2 (channels 2 and 3).
    M1B = 2,
    /// Motor output 3 (channels 4 and 5).
    M2A = 3,
    /// Motor output 4 (channels 6 and 7).
    M2B = 4,
}

impl MotorPort {
    /// All motor ports in index order.
    pub const ALL: [MotorPort; 4] = [Self::M1A, Self::M1B, Self::M2A, Self::M2B];

    /// Validates a 1-based motor index.
    pub fn new(index: i32) -> Result<Self, RangeError> {
        match index {
            1 => Ok(Self::M1A),
            2 => Ok(Self::M1B),
            3 => Ok(Self::M2A),
            4 => Ok(Self::M2B),
            _ => Err(RangeError::new("motor port", index, 1, 4)),
        }
    }

    /// Returns the 1-based motor index.
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// The channel pair driving this motor: `(forward, reverse)`.
    pub const fn channels(self) -> (Channel, Channel) {
        let a = (self.index() - 1) * 2;
        (Channel(a), Channel(a + 1))
    }

    /// Returns the port label as printed on the board.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1A => "M1A",
            Self::M1B => "M1B",
            Self::M2A => "M2A",
            Self::M2B => "M2B",
        }
    }

    /// Parse a motor port from its board label or index.
    ///
    /// Accepts `"M1A"`..`"M2B"` or `"1"`..`"4"`, trimmed and case-insensitive.
    pub fn from_text(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .or_else(|| s.parse::<i32>().ok().and_then(|i| Self::new(i).ok()))
    }
}

impl TryFrom<i32> for MotorPort {
    type Error = RangeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for MotorPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Servo Ports
// ============================================================================

/// One of the eight servo outputs, `S1`..`S8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoPort(u8);

impl ServoPort {
    /// Servo channels start after the motor channels.
    const CHANNEL_OFFSET: u8 = 7;

    /// Validates a 1-based servo index.
    pub fn new(index: i32) -> Result<Self, RangeError> {
        let index = RangeError::check("servo port", index, 1, 8)?;
        Ok(Self(index as u8))
    }

    /// Returns the 1-based servo index.
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Expander channel for this servo (`index + 7`).
    pub const fn channel(self) -> Channel {
        Channel(self.0 + Self::CHANNEL_OFFSET)
    }

    /// Parse a servo port from `"S1"`..`"S8"` or `"1"`..`"8"`.
    ///
    /// Input is trimmed and case-insensitive.
    pub fn from_text(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix('S')
            .or_else(|| s.strip_prefix('s'))
            .unwrap_or(s);
        digits.parse::<i32>().ok().and_then(|i| Self::new(i).ok())
    }
}

impl TryFrom<i32> for ServoPort {
    type Error = RangeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ServoPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// A servo angle in degrees, 0-180.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoAngle(u8);

impl ServoAngle {
    /// Largest accepted angle.
    pub const MAX_DEGREES: u8 = 180;

    /// Validates an angle.
    pub fn new(degrees: i32) -> Result<Self, RangeError> {
        let degrees = RangeError::check("servo angle", degrees, 0, Self::MAX_DEGREES as i32)?;
        Ok(Self(degrees as u8))
    }

    /// Returns the angle in degrees.
    #[inline]
    pub const fn degrees(self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for ServoAngle {
    type Error = RangeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
