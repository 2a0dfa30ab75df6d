//! # smartfarm-kit
//!
//! Drivers for the "IDEA KIT: Smart farm" robotics board: DC motors and
//! servos on a PCA9685 PWM expander, an HC-SR04 ultrasonic sensor with a
//! proximity debounce filter, and a DHT11/DHT22 temperature and humidity
//! sensor.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Drivers are generic over `embedded-hal` 1.0
//!   (`I2c`, `InputPin`, `OutputPin`, `DelayNs`) plus a small [`Clock`] trait
//! - **Lazy expander setup**: The first actuator call resets the PCA9685 and
//!   programs 50 Hz; later calls go straight to the channel registers
//! - **Validated inputs**: Motor ports, servo ports, angles and channels are
//!   newtypes; a rejected number never reaches the bus
//! - **Bounded protocols**: DHT and sonar waits have deadlines, so an absent
//!   sensor reports an error instead of hanging
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `pca9685` - Register driver and expander controller
//! - `actuators` - Motor speed and servo angle mapping onto channels
//! - `dht` - Single-wire temperature/humidity protocol
//! - `sonar` - HC-SR04 ranging and the proximity vote
//! - `kit` - Block-level facade that ties everything together
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use smartfarm_kit::{
//!     SmartFarmKit, BlockCommand, BlockOutcome, Direction, MotorPort,
//!     config::Config,
//!     hal::{MockI2c, MockTimer},
//! };
//!
//! let timer = MockTimer::new();
//! let mut kit = SmartFarmKit::new(MockI2c::new(), timer.clone(), timer, Config::default());
//!
//! // Typed commands
//! let outcome = kit.apply_command("motor M1A -100".parse().unwrap()).unwrap();
//! assert_eq!(
//!     outcome,
//!     BlockOutcome::Motor { port: MotorPort::M1A, direction: Direction::Reverse, duty: 1600 }
//! );
//!
//! // Or block-level numbers
//! kit.servo_raw(2, 45).unwrap();
//! assert!(kit.motor_run_raw(5, 100).is_err());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Motor and servo mapping onto expander channels.
pub mod actuators;
/// Typed actuator commands, outcomes and text parsing.
pub mod commands;
/// Shared configuration for desktop and ESP32.
pub mod config;
/// DHT11/DHT22 temperature and humidity sensor.
pub mod dht;
/// Error types.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Block-level facade over the expander and sensors.
pub mod kit;
/// PCA9685 register driver and PWM expander controller.
pub mod pca9685;
/// Validated channel, port and angle types.
pub mod ports;
/// Ultrasonic ranging and proximity debouncing.
pub mod sonar;
/// Hardware traits beyond `embedded-hal`.
pub mod traits;

// Re-exports for convenience
pub use commands::{BlockCommand, BlockOutcome, CommandKind, ParseError};
pub use dht::{DhtReading, DhtSensor, DHT_SENTINEL};
pub use error::{DhtError, PwmError, RangeError};
pub use kit::SmartFarmKit;
pub use pca9685::Pca9685;
pub use ports::{Channel, DutyCycle, MotorPort, ServoAngle, ServoPort};
pub use sonar::{HcSr04, ProximityFilter};
pub use traits::{Clock, Direction, SonarRanger};

// Config re-exports
pub use config::{
    Config, DhtConfig, PrescaleRounding, ProximityConfig, PwmConfig, SensorVariant, SonarConfig,
};
