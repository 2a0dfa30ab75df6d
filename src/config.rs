//! Configuration for the expander, sensors and proximity filter.
//!
//! Every value has a default matching the kit's wiring and the sensor
//! datasheets, and a `with_*` builder for overriding it.
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::config::{Config, DhtConfig, PwmConfig, SensorVariant};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.pwm.address, 0x40);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_pwm(PwmConfig::default().with_frequency_hz(60))
//!     .with_dht(DhtConfig::default().with_variant(SensorVariant::Dht22));
//! assert_eq!(config.pwm.frequency_hz, 60);
//! ```

// ============================================================================
// Main Config
// ============================================================================

/// Complete kit configuration
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// PWM expander configuration
    pub pwm: PwmConfig,
    /// Humidity/temperature sensor configuration
    pub dht: DhtConfig,
    /// Proximity debounce configuration
    pub proximity: ProximityConfig,
    /// Ultrasonic sensor configuration
    pub sonar: SonarConfig,
}

impl Config {
    /// Set PWM expander configuration
    pub fn with_pwm(mut self, pwm: PwmConfig) -> Self {
        self.pwm = pwm;
        self
    }

    /// Set DHT sensor configuration
    pub fn with_dht(mut self, dht: DhtConfig) -> Self {
        self.dht = dht;
        self
    }

    /// Set proximity filter configuration
    pub fn with_proximity(mut self, proximity: ProximityConfig) -> Self {
        self.proximity = proximity;
        self
    }

    /// Set sonar configuration
    pub fn with_sonar(mut self, sonar: SonarConfig) -> Self {
        self.sonar = sonar;
        self
    }
}

// ============================================================================
// PWM Config
// ============================================================================

/// How the prescale value is derived from the requested frequency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PrescaleRounding {
    /// Drop the fractional part (50 Hz gives 121).
    ///
    /// This is what the block-programming extension has always written.
    #[default]
    Truncate,
    /// Round to the nearest integer, as the PCA9685 datasheet formula does.
    Nearest,
}

/// PCA9685 expander configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PwmConfig {
    /// 7-bit I2C address
    pub address: u8,
    /// Internal oscillator frequency in Hz
    pub oscillator_hz: u32,
    /// Output frequency programmed during initialization
    pub frequency_hz: u16,
    /// Prescale rounding rule
    pub rounding: PrescaleRounding,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            address: 0x40,
            oscillator_hz: 25_000_000,
            frequency_hz: 50,
            rounding: PrescaleRounding::Truncate,
        }
    }
}

impl PwmConfig {
    /// Set the I2C address
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Set the oscillator frequency
    pub fn with_oscillator_hz(mut self, hz: u32) -> Self {
        self.oscillator_hz = hz;
        self
    }

    /// Set the output frequency
    pub fn with_frequency_hz(mut self, hz: u16) -> Self {
        self.frequency_hz = hz;
        self
    }

    /// Set the prescale rounding rule
    pub fn with_rounding(mut self, rounding: PrescaleRounding) -> Self {
        self.rounding = rounding;
        self
    }
}

// ============================================================================
// DHT Config
// ============================================================================

/// Which member of the DHT family is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorVariant {
    /// DHT11: integer and hundredths bytes, unsigned temperature.
    #[default]
    Dht11,
    /// DHT22/AM2302: 16-bit tenths, sign bit on temperature.
    Dht22,
}

/// Timing for the single-wire DHT protocol
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DhtConfig {
    /// Sensor variant used to decode the data bytes
    pub variant: SensorVariant,
    /// How long the start signal holds the line low (milliseconds)
    pub start_low_ms: u32,
    /// Wait after releasing the line before polling (microseconds)
    pub release_wait_us: u32,
    /// Delay after a rising edge before sampling a bit (microseconds)
    pub sample_delay_us: u32,
    /// Deadline for each half of the acknowledgment pulse (microseconds)
    pub ack_timeout_us: u32,
    /// Deadline for each edge while reading a bit (microseconds)
    pub bit_timeout_us: u32,
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            variant: SensorVariant::Dht11,
            start_low_ms: 18,
            release_wait_us: 40,
            sample_delay_us: 28,
            ack_timeout_us: 200,
            bit_timeout_us: 150,
        }
    }
}

impl DhtConfig {
    /// Set the sensor variant
    pub fn with_variant(mut self, variant: SensorVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the start signal duration
    pub fn with_start_low_ms(mut self, ms: u32) -> Self {
        self.start_low_ms = ms;
        self
    }

    /// Set the bit sample delay
    pub fn with_sample_delay_us(mut self, us: u32) -> Self {
        self.sample_delay_us = us;
        self
    }

    /// Set the acknowledgment deadline
    pub fn with_ack_timeout_us(mut self, us: u32) -> Self {
        self.ack_timeout_us = us;
        self
    }

    /// Set the per-bit deadline
    pub fn with_bit_timeout_us(mut self, us: u32) -> Self {
        self.bit_timeout_us = us;
        self
    }
}

// ============================================================================
// Proximity Config
// ============================================================================

/// Proximity debounce configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProximityConfig {
    /// Hits within the window needed to report "near"
    pub min_hits: usize,
    /// Treat a 0 cm reading (no echo) as a miss instead of a hit
    pub ignore_zero: bool,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            min_hits: 5,
            ignore_zero: false,
        }
    }
}

impl ProximityConfig {
    /// Set the hit count needed to report "near"
    pub fn with_min_hits(mut self, hits: usize) -> Self {
        self.min_hits = hits;
        self
    }

    /// Set whether 0 cm readings are ignored
    pub fn with_ignore_zero(mut self, ignore: bool) -> Self {
        self.ignore_zero = ignore;
        self
    }
}

// ============================================================================
// Sonar Config
// ============================================================================

/// Ultrasonic sensor configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SonarConfig {
    /// Longest distance waited for before reporting no echo (centimeters)
    pub max_distance_cm: u32,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            max_distance_cm: 500,
        }
    }
}

impl SonarConfig {
    /// Set the maximum distance
    pub fn with_max_distance_cm(mut self, cm: u32) -> Self {
        self.max_distance_cm = cm;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.pwm.address, 0x40);
        assert_eq!(config.pwm.frequency_hz, 50);
        assert_eq!(config.dht.variant, SensorVariant::Dht11);
        assert_eq!(config.proximity.min_hits, 5);
        assert_eq!(config.sonar.max_distance_cm, 500);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_pwm(
                PwmConfig::default()
                    .with_address(0x41)
                    .with_frequency_hz(1000)
                    .with_rounding(PrescaleRounding::Nearest),
            )
            .with_proximity(ProximityConfig::default().with_min_hits(7))
            .with_sonar(SonarConfig::default().with_max_distance_cm(200));

        assert_eq!(config.pwm.address, 0x41);
        assert_eq!(config.pwm.frequency_hz, 1000);
        assert_eq!(config.pwm.rounding, PrescaleRounding::Nearest);
        assert_eq!(config.proximity.min_hits, 7);
        assert_eq!(config.sonar.max_distance_cm, 200);
    }

    // =========================================================================
    // PwmConfig Tests
    // =========================================================================

    #[test]
    fn pwm_config_default() {
        let pwm = PwmConfig::default();
        assert_eq!(pwm.oscillator_hz, 25_000_000);
        assert_eq!(pwm.rounding, PrescaleRounding::Truncate);
    }

    // =========================================================================
    // DhtConfig Tests
    // =========================================================================

    #[test]
    fn dht_config_default_timing() {
        let dht = DhtConfig::default();
        assert_eq!(dht.start_low_ms, 18);
        assert_eq!(dht.release_wait_us, 40);
        assert_eq!(dht.sample_delay_us, 28);
        assert_eq!(dht.ack_timeout_us, 200);
        assert_eq!(dht.bit_timeout_us, 150);
    }

    #[test]
    fn dht_config_builder() {
        let dht = DhtConfig::default()
            .with_variant(SensorVariant::Dht22)
            .with_start_low_ms(2)
            .with_sample_delay_us(30)
            .with_ack_timeout_us(500)
            .with_bit_timeout_us(300);

        assert_eq!(dht.variant, SensorVariant::Dht22);
        assert_eq!(dht.start_low_ms, 2);
        assert_eq!(dht.sample_delay_us, 30);
        assert_eq!(dht.ack_timeout_us, 500);
        assert_eq!(dht.bit_timeout_us, 300);
    }

    // =========================================================================
    // ProximityConfig Tests
    // =========================================================================

    #[test]
    fn proximity_config_default() {
        let proximity = ProximityConfig::default();
        assert_eq!(proximity.min_hits, 5);
        assert!(!proximity.ignore_zero);

        let proximity = proximity.with_ignore_zero(true);
        assert!(proximity.ignore_zero);
    }
}
