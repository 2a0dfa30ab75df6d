//! Typed actuator commands for the kit.
//!
//! A [`BlockCommand`] is one actuator action as a block program would issue
//! it: run a motor, stop motors, or move a servo. Ports and angles are
//! validated when the command is built, so applying a command can only fail
//! on the bus.
//!
//! Commands can also be parsed from a short text form, handy for serial
//! consoles and tests:
//!
//! | Text | Command |
//! |------|---------|
//! | `motor M1A 150` | [`BlockCommand::MotorRun`] |
//! | `motor 3 -80` | [`BlockCommand::MotorRun`] |
//! | `stop M2B` | [`BlockCommand::StopMotor`] |
//! | `stop all` | [`BlockCommand::StopAllMotors`] |
//! | `servo S1 90` | [`BlockCommand::Servo`] |
//!
//! ```rust
//! use smartfarm_kit::commands::{BlockCommand, CommandKind};
//! use smartfarm_kit::MotorPort;
//!
//! let cmd: BlockCommand = "motor m1b -100".parse().unwrap();
//! assert_eq!(cmd, BlockCommand::MotorRun { port: MotorPort::M1B, speed: -100 });
//! assert_eq!(cmd.kind(), CommandKind::Motor);
//!
//! assert!("servo S9 90".parse::<BlockCommand>().is_err());
//! ```
//!
//! When applied through [`SmartFarmKit::apply_command`](crate::SmartFarmKit::apply_command)
//! a command returns a [`BlockOutcome`] describing what reached the hardware.

use core::fmt;
use core::str::FromStr;

use crate::error::RangeError;
use crate::ports::{MotorPort, ServoAngle, ServoPort};
use crate::traits::Direction;

// ============================================================================
// Commands
// ============================================================================

/// Category of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CommandKind {
    /// Motor speed or stop.
    Motor,
    /// Servo position.
    Servo,
}

/// One actuator action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BlockCommand {
    /// Run a motor at a signed speed (nominally -255..=255, saturating).
    MotorRun {
        /// Motor output.
        port: MotorPort,
        /// Signed speed; the sign picks the direction.
        speed: i32,
    },
    /// Turn one motor off.
    StopMotor(MotorPort),
    /// Turn all four motors off.
    StopAllMotors,
    /// Move a servo.
    Servo {
        /// Servo output.
        port: ServoPort,
        /// Target angle.
        angle: ServoAngle,
    },
}

impl BlockCommand {
    /// Builds a motor command from block-level numbers.
    pub fn motor_run(index: i32, speed: i32) -> Result<Self, RangeError> {
        Ok(Self::MotorRun {
            port: MotorPort::new(index)?,
            speed,
        })
    }

    /// Builds a servo command from block-level numbers.
    pub fn servo(index: i32, degrees: i32) -> Result<Self, RangeError> {
        Ok(Self::Servo {
            port: ServoPort::new(index)?,
            angle: ServoAngle::new(degrees)?,
        })
    }

    /// Returns the command category.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::MotorRun { .. } | Self::StopMotor(_) | Self::StopAllMotors => CommandKind::Motor,
            Self::Servo { .. } => CommandKind::Servo,
        }
    }

    /// Returns true for commands that only turn motors off.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            Self::StopMotor(_) | Self::StopAllMotors | Self::MotorRun { speed: 0, .. }
        )
    }
}

impl fmt::Display for BlockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MotorRun { port, speed } => write!(f, "motor {} {}", port, speed),
            Self::StopMotor(port) => write!(f, "stop {}", port),
            Self::StopAllMotors => f.write_str("stop all"),
            Self::Servo { port, angle } => write!(f, "servo {} {}", port, angle.degrees()),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// What an applied command wrote to the expander.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockOutcome {
    /// A motor's channel pair was programmed.
    Motor {
        /// Motor output.
        port: MotorPort,
        /// Direction applied.
        direction: Direction,
        /// Off count on the driven channel (0 when stopped).
        duty: u16,
    },
    /// All motor channels were zeroed.
    AllMotorsStopped,
    /// A servo channel was programmed.
    Servo {
        /// Servo output.
        port: ServoPort,
        /// Angle applied.
        angle: ServoAngle,
        /// Off count written to the channel.
        duty: u16,
    },
}

// ============================================================================
// Parsing
// ============================================================================

/// Why a command string was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace.
    Empty,
    /// The first word is not `motor`, `stop` or `servo`.
    UnknownVerb,
    /// A required argument is absent.
    MissingArgument(&'static str),
    /// An argument is not a valid integer.
    InvalidNumber(&'static str),
    /// A port name that names no output.
    UnknownPort(&'static str),
    /// A number outside its valid range.
    OutOfRange(RangeError),
    /// Extra words after a complete command.
    TrailingInput,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty command"),
            Self::UnknownVerb => f.write_str("unknown command (expected motor, stop or servo)"),
            Self::MissingArgument(what) => write!(f, "missing {}", what),
            Self::InvalidNumber(what) => write!(f, "{} is not a number", what),
            Self::UnknownPort(what) => write!(f, "unknown {} port", what),
            Self::OutOfRange(e) => write!(f, "{}", e),
            Self::TrailingInput => f.write_str("unexpected text after command"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

impl From<RangeError> for ParseError {
    fn from(e: RangeError) -> Self {
        Self::OutOfRange(e)
    }
}

fn number(word: Option<&str>, what: &'static str) -> Result<i32, ParseError> {
    word.ok_or(ParseError::MissingArgument(what))?
        .parse()
        .map_err(|_| ParseError::InvalidNumber(what))
}

impl FromStr for BlockCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().ok_or(ParseError::Empty)?;

        let command = if verb.eq_ignore_ascii_case("motor") {
            let port = words.next().ok_or(ParseError::MissingArgument("motor port"))?;
            let port = MotorPort::from_text(port).ok_or(ParseError::UnknownPort("motor"))?;
            let speed = number(words.next(), "speed")?;
            Self::MotorRun { port, speed }
        } else if verb.eq_ignore_ascii_case("stop") {
            let target = words.next().ok_or(ParseError::MissingArgument("motor port"))?;
            if target.eq_ignore_ascii_case("all") {
                Self::StopAllMotors
            } else {
                Self::StopMotor(MotorPort::from_text(target).ok_or(ParseError::UnknownPort("motor"))?)
            }
        } else if verb.eq_ignore_ascii_case("servo") {
            let port = words.next().ok_or(ParseError::MissingArgument("servo port"))?;
            let port = ServoPort::from_text(port).ok_or(ParseError::UnknownPort("servo"))?;
            let angle = ServoAngle::new(number(words.next(), "angle")?)?;
            Self::Servo { port, angle }
        } else {
            return Err(ParseError::UnknownVerb);
        };

        if words.next().is_some() {
            return Err(ParseError::TrailingInput);
        }
        Ok(command)
    }
}
