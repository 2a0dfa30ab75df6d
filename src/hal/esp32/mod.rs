//! ESP32 hardware abstraction layer for the smart farm kit.
//!
//! The drivers themselves are generic over `embedded-hal`, and the
//! `esp-idf-hal` I2C driver, GPIO pin drivers and `Ets` delay implement those
//! traits directly. This module only adds the [`Clock`](crate::traits::Clock)
//! implementation and the board's wiring.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini
//! - **PWM expander**: PCA9685 at 0x40 driving 4 motor outputs and 8 servos
//! - **Sonar**: HC-SR04 (5 V part; echo through a divider)
//! - **Climate sensor**: DHT11 with a 10k pull-up on the data line
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments.

mod clock;

pub use clock::Esp32Clock;

/// Pin assignments for the kit on a SuperMini ESP32-C3.
pub mod pins {
    // =========================================================================
    // I2C (PCA9685)
    // =========================================================================

    /// I2C data line (also has onboard blue LED - will flicker during I2C)
    pub const I2C_SDA: i32 = 8;

    /// I2C clock line (also shared with BOOT button - only affects programming)
    pub const I2C_SCL: i32 = 9;

    /// I2C bus speed
    pub const I2C_BAUDRATE_HZ: u32 = 100_000;

    // =========================================================================
    // Sonar (HC-SR04)
    // =========================================================================

    /// Trigger output
    pub const SONAR_TRIG: i32 = 2;

    /// Echo input
    pub const SONAR_ECHO: i32 = 3;

    // =========================================================================
    // DHT11
    // =========================================================================

    /// Single-wire data line (open-drain)
    pub const DHT_DATA: i32 = 4;
}
