//! Trait definitions for hardware abstraction.
//!
//! The drivers in this crate are generic over the `embedded-hal` 1.0 traits
//! for I2C, GPIO and delays. This module adds the seams that `embedded-hal`
//! leaves open:
//!
//! - [`Clock`]: Monotonic microsecond time for bounded polling
//! - [`SonarRanger`]: Ultrasonic distance measurement
//!
//! It also defines [`Direction`], the motor direction derived from a signed
//! speed.

pub mod hardware;

pub use hardware::*;
