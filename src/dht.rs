//! DHT11/DHT22 single-wire humidity and temperature sensor.
//!
//! The protocol is bit-banged on one open-drain pin with a pull-up:
//!
//! 1. The host holds the line low for 18 ms, releases it and waits 40 µs.
//! 2. The sensor acknowledges with ~80 µs low followed by ~80 µs high.
//! 3. Each of the 40 data bits is ~50 µs low followed by a high pulse of
//!    ~27 µs (`0`) or ~70 µs (`1`). Sampling 28 µs after the rising edge
//!    tells them apart.
//! 4. The five bytes are humidity (integer, fraction), temperature (integer,
//!    fraction) and a checksum equal to the low byte of the sum of the first
//!    four.
//!
//! Every wait is a bounded polling loop measured on a [`Clock`]: a
//! disconnected sensor yields [`DhtError::NoResponse`] instead of blocking
//! forever.
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::config::DhtConfig;
//! use smartfarm_kit::dht::DhtSensor;
//! use smartfarm_kit::hal::{MockDhtLine, MockTimer};
//!
//! let timer = MockTimer::new();
//! // 55.0 %RH, 24.0 °C
//! let line = MockDhtLine::responding(&timer, [55, 0, 24, 0, 79]);
//! let mut sensor = DhtSensor::new(line, DhtConfig::default());
//!
//! let reading = sensor.read(&mut timer.clone(), &timer).unwrap();
//! assert_eq!(reading.temperature_c, 24.0);
//! assert_eq!(reading.humidity_pct, 55.0);
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::{debug, warn};

use crate::config::{DhtConfig, SensorVariant};
use crate::error::DhtError;
use crate::traits::Clock;

/// Value reported by the block-level temperature read when it fails.
pub const DHT_SENTINEL: f32 = -999.0;

/// Number of data bits in one transmission.
pub const DATA_BITS: usize = 40;

type PinError<P> = <P as ErrorType>::Error;

/// A successful, checksum-verified reading.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DhtReading {
    /// The five bytes as received (humidity int, humidity frac, temperature
    /// int, temperature frac, checksum).
    pub raw: [u8; 5],
    /// Temperature in degrees Celsius.
    pub temperature_c: f32,
    /// Relative humidity in percent.
    pub humidity_pct: f32,
    /// Time from start signal to the last bit, in microseconds.
    pub elapsed_us: u64,
}

// ============================================================================
// Decoding
// ============================================================================

/// Packs 40 sampled bits into 5 bytes, most significant bit first.
pub fn pack_bits(bits: &[bool; DATA_BITS]) -> [u8; 5] {
    let mut bytes = [0u8; 5];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
    bytes
}

/// Low byte of the sum of the four data bytes.
pub fn checksum(data: &[u8; 4]) -> u8 {
    let mut sum: u16 = data.iter().map(|&b| b as u16).sum();
    if sum >= 512 {
        sum -= 512;
    }
    if sum >= 256 {
        sum -= 256;
    }
    sum as u8
}

/// Verifies the fifth byte against the first four.
pub fn verify<E>(raw: &[u8; 5]) -> Result<(), DhtError<E>> {
    let computed = checksum(&[raw[0], raw[1], raw[2], raw[3]]);
    if computed == raw[4] {
        Ok(())
    } else {
        Err(DhtError::Checksum {
            expected: raw[4],
            computed,
        })
    }
}

/// Decodes `(temperature_c, humidity_pct)` from verified bytes.
pub fn decode(variant: SensorVariant, raw: &[u8; 5]) -> (f32, f32) {
    match variant {
        SensorVariant::Dht11 => {
            let temperature = raw[2] as f32 + raw[3] as f32 / 100.0;
            let humidity = raw[0] as f32 + raw[1] as f32 / 100.0;
            (temperature, humidity)
        }
        SensorVariant::Dht22 => {
            let magnitude = ((raw[2] & 0x7F) as u16 * 256 + raw[3] as u16) as f32 / 10.0;
            let temperature = if raw[2] & 0x80 != 0 {
                -magnitude
            } else {
                magnitude
            };
            let humidity = (raw[0] as u16 * 256 + raw[1] as u16) as f32 / 10.0;
            (temperature, humidity)
        }
    }
}

// ============================================================================
// Sensor
// ============================================================================

/// A DHT sensor on an open-drain data pin.
///
/// Writing high releases the line to the pull-up; writing low drives it.
pub struct DhtSensor<P> {
    pin: P,
    config: DhtConfig,
}

impl<P> DhtSensor<P>
where
    P: InputPin + OutputPin,
{
    /// Wraps a data pin.
    pub fn new(pin: P, config: DhtConfig) -> Self {
        Self { pin, config }
    }

    /// Returns the sensor configuration.
    pub fn config(&self) -> &DhtConfig {
        &self.config
    }

    /// Borrows the data pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Consumes the sensor and returns the data pin.
    pub fn release(self) -> P {
        self.pin
    }

    /// Performs one full transaction and returns a verified reading.
    ///
    /// Blocks for roughly 20-25 ms.
    pub fn read<D: DelayNs, C: Clock>(
        &mut self,
        delay: &mut D,
        clock: &C,
    ) -> Result<DhtReading, DhtError<PinError<P>>> {
        let start = clock.now_us();

        // start signal, then hand the line to the pull-up
        self.pin.set_low().map_err(DhtError::Pin)?;
        delay.delay_ms(self.config.start_low_ms);
        self.pin.set_high().map_err(DhtError::Pin)?;
        delay.delay_us(self.config.release_wait_us);

        let ack = self.config.ack_timeout_us;
        if !self.wait_while(clock, false, ack)? || !self.wait_while(clock, true, ack)? {
            warn!("dht: no acknowledgment within {} us", ack);
            return Err(DhtError::NoResponse);
        }

        let mut bits = [false; DATA_BITS];
        let timeout = self.config.bit_timeout_us;
        for (index, bit) in bits.iter_mut().enumerate() {
            if !self.wait_while(clock, true, timeout)? || !self.wait_while(clock, false, timeout)? {
                warn!("dht: line stalled at bit {}", index);
                return Err(DhtError::Timeout { bit: index as u8 });
            }
            delay.delay_us(self.config.sample_delay_us);
            *bit = self.pin.is_high().map_err(DhtError::Pin)?;
        }
        let elapsed_us = clock.elapsed_us(start);

        let raw = pack_bits(&bits);
        if let Err(e) = verify(&raw) {
            warn!("dht: checksum mismatch in {:02x?}", raw);
            return Err(e);
        }

        let (temperature_c, humidity_pct) = decode(self.config.variant, &raw);
        debug!(
            "dht: {:.2} C, {:.2} %RH in {} us",
            temperature_c, humidity_pct, elapsed_us
        );
        Ok(DhtReading {
            raw,
            temperature_c,
            humidity_pct,
            elapsed_us,
        })
    }

    /// Reads only the temperature.
    pub fn read_temperature<D: DelayNs, C: Clock>(
        &mut self,
        delay: &mut D,
        clock: &C,
    ) -> Result<f32, DhtError<PinError<P>>> {
        self.read(delay, clock).map(|r| r.temperature_c)
    }

    /// Reads the temperature, reporting [`DHT_SENTINEL`] on any failure.
    pub fn read_temperature_or_sentinel<D: DelayNs, C: Clock>(
        &mut self,
        delay: &mut D,
        clock: &C,
    ) -> f32 {
        self.read_temperature(delay, clock).unwrap_or(DHT_SENTINEL)
    }

    /// Polls while the line reads `level`.
    ///
    /// Returns `Ok(false)` if it still reads `level` after `timeout_us`.
    fn wait_while<C: Clock>(
        &mut self,
        clock: &C,
        level: bool,
        timeout_us: u32,
    ) -> Result<bool, DhtError<PinError<P>>> {
        let start = clock.now_us();
        while self.pin.is_high().map_err(DhtError::Pin)? == level {
            if clock.elapsed_us(start) > timeout_us as u64 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockDhtLine, MockTimer};

    fn sensor(line: MockDhtLine) -> DhtSensor<MockDhtLine> {
        DhtSensor::new(line, DhtConfig::default())
    }

    // =========================================================================
    // Bit Packing Tests
    // =========================================================================

    #[test]
    fn pack_bits_msb_first() {
        let mut bits = [false; DATA_BITS];
        bits[0] = true; // byte 0, 0x80
        bits[15] = true; // byte 1, 0x01
        bits[39] = true; // byte 4, 0x01
        assert_eq!(pack_bits(&bits), [0x80, 0x01, 0x00, 0x00, 0x01]);
    }

    // =========================================================================
    // Checksum Tests
    // =========================================================================

    #[test]
    fn checksum_boundaries() {
        assert_eq!(checksum(&[255, 0, 0, 0]), 255);
        assert_eq!(checksum(&[255, 1, 0, 0]), 0);
        assert_eq!(checksum(&[255, 255, 1, 0]), 255);
        assert_eq!(checksum(&[255, 255, 2, 0]), 0);
        assert_eq!(checksum(&[255, 255, 255, 255]), 252);
    }

    #[test]
    fn verify_reports_both_bytes() {
        let result = verify::<()>(&[40, 0, 25, 0, 66]);
        assert_eq!(
            result,
            Err(DhtError::Checksum {
                expected: 66,
                computed: 65
            })
        );
        assert_eq!(verify::<()>(&[40, 0, 25, 0, 65]), Ok(()));
    }

    // =========================================================================
    // Decode Tests
    // =========================================================================

    #[test]
    fn decode_dht11() {
        let (t, h) = decode(SensorVariant::Dht11, &[45, 50, 23, 25, 0]);
        assert!((t - 23.25).abs() < 1e-4);
        assert!((h - 45.5).abs() < 1e-4);
    }

    #[test]
    fn decode_dht22_positive() {
        // 65.2 %RH = 0x028C, 35.1 C = 0x015F
        let (t, h) = decode(SensorVariant::Dht22, &[0x02, 0x8C, 0x01, 0x5F, 0]);
        assert!((t - 35.1).abs() < 1e-4);
        assert!((h - 65.2).abs() < 1e-4);
    }

    #[test]
    fn decode_dht22_negative() {
        // -10.1 C = 0x8065
        let (t, _) = decode(SensorVariant::Dht22, &[0, 0, 0x80, 0x65, 0]);
        assert!((t + 10.1).abs() < 1e-4);
    }

    // =========================================================================
    // Protocol Tests
    // =========================================================================

    #[test]
    fn read_valid_transmission() {
        let timer = MockTimer::new();
        let raw = [62, 0, 27, 30, 119];
        let mut dht = sensor(MockDhtLine::responding(&timer, raw));

        let reading = dht.read(&mut timer.clone(), &timer).unwrap();
        assert_eq!(reading.raw, raw);
        assert!((reading.temperature_c - 27.3).abs() < 1e-4);
        assert!((reading.humidity_pct - 62.0).abs() < 1e-4);
        // 18 ms start signal plus the transmission
        assert!(reading.elapsed_us > 18_000);
        assert!(reading.elapsed_us < 25_000);
    }

    #[test]
    fn read_sends_18ms_start_signal() {
        let timer = MockTimer::new();
        let mut dht = sensor(MockDhtLine::responding(&timer, [1, 0, 1, 0, 2]));
        dht.read(&mut timer.clone(), &timer).unwrap();
        assert_eq!(dht.pin().start_signal_us(), Some(18_000));
    }

    #[test]
    fn read_checksum_failure() {
        let timer = MockTimer::new();
        let mut dht = sensor(MockDhtLine::responding(&timer, [62, 0, 27, 30, 120]));
        assert_eq!(
            dht.read(&mut timer.clone(), &timer),
            Err(DhtError::Checksum {
                expected: 120,
                computed: 119
            })
        );
    }

    #[test]
    fn silent_sensor_times_out() {
        let timer = MockTimer::new();
        let mut dht = sensor(MockDhtLine::silent(&timer));
        assert_eq!(
            dht.read(&mut timer.clone(), &timer),
            Err(DhtError::NoResponse)
        );
    }

    #[test]
    fn stuck_low_line_times_out() {
        let timer = MockTimer::new();
        let mut dht = sensor(MockDhtLine::stuck_low(&timer));
        assert_eq!(
            dht.read(&mut timer.clone(), &timer),
            Err(DhtError::NoResponse)
        );
    }

    #[test]
    fn truncated_transmission_reports_bit() {
        let timer = MockTimer::new();
        let line = MockDhtLine::truncated(&timer, [62, 0, 27, 30, 119], 12);
        let mut dht = sensor(line);
        assert_eq!(
            dht.read(&mut timer.clone(), &timer),
            Err(DhtError::Timeout { bit: 12 })
        );
    }

    #[test]
    fn sentinel_on_failure() {
        let timer = MockTimer::new();
        let mut dht = sensor(MockDhtLine::silent(&timer));
        assert_eq!(
            dht.read_temperature_or_sentinel(&mut timer.clone(), &timer),
            DHT_SENTINEL
        );
    }

    #[test]
    fn dht22_variant_over_the_wire() {
        let timer = MockTimer::new();
        let raw = [0x02, 0x8C, 0x80, 0x65, 0x73];
        let line = MockDhtLine::responding(&timer, raw);
        let mut dht = DhtSensor::new(
            line,
            DhtConfig::default().with_variant(SensorVariant::Dht22),
        );
        let t = dht.read_temperature(&mut timer.clone(), &timer).unwrap();
        assert!((t + 10.1).abs() < 1e-4);
    }
}
