//! Motor and servo mapping onto expander channels.
//!
//! Each DC motor sits on an H-bridge fed by two adjacent expander channels.
//! Direction is chosen by which channel carries the PWM: forward drives the
//! first channel and holds the second at zero, reverse does the opposite.
//! There is no separate direction signal.
//!
//! Servos expect a 600-2400 µs pulse every 20 ms (50 Hz). The angle maps
//! linearly onto that pulse width, which is then expressed in 4096ths of the
//! period.
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::actuators::{motor_duties, servo_duty};
//! use smartfarm_kit::ServoAngle;
//!
//! let (forward, reverse) = motor_duties(-100);
//! assert_eq!(forward.off(), 0);
//! assert_eq!(reverse.off(), 1600);
//!
//! assert_eq!(servo_duty(ServoAngle::new(90).unwrap()).off(), 307);
//! ```

use embedded_hal::i2c::I2c;
use log::debug;

use crate::error::PwmError;
use crate::pca9685::Pca9685;
use crate::ports::{DutyCycle, MotorPort, ServoAngle, ServoPort, MAX_TICKS};
use crate::traits::Direction;

/// Largest block-level motor speed.
pub const MAX_SPEED: i32 = 255;

/// Speed is scaled into the 12-bit duty range by this factor.
const SPEED_SCALE: i32 = 16;

/// Servo pulse width at 0 degrees (µs).
pub const SERVO_MIN_PULSE_US: u32 = 600;
/// Servo pulse width at 180 degrees (µs).
pub const SERVO_MAX_PULSE_US: u32 = 2400;
/// Servo PWM period at 50 Hz (µs).
pub const SERVO_PERIOD_US: u32 = 20_000;

/// Scales a block-level speed (±255) to a signed duty count, clamped to ±4095.
pub fn scale_speed(speed: i32) -> i32 {
    speed
        .saturating_mul(SPEED_SCALE)
        .clamp(-(MAX_TICKS as i32), MAX_TICKS as i32)
}

/// Duty cycles for a motor's `(forward, reverse)` channel pair.
///
/// Exactly one channel carries a non-zero off count (unless `speed` is 0),
/// equal to `min(4095, |speed| * 16)`.
pub fn motor_duties(speed: i32) -> (DutyCycle, DutyCycle) {
    let scaled = scale_speed(speed);
    let magnitude = DutyCycle::pulse(scaled.unsigned_abs() as u16);
    if scaled >= 0 {
        (magnitude, DutyCycle::OFF)
    } else {
        (DutyCycle::OFF, magnitude)
    }
}

/// Servo pulse width in microseconds for an angle.
pub fn servo_pulse_us(angle: ServoAngle) -> u32 {
    angle.degrees() as u32 * (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) / 180 + SERVO_MIN_PULSE_US
}

/// Duty cycle for a servo angle at 50 Hz.
///
/// `pulse_us * 4096 / 20000`, rounded down: 0° gives 122 ticks, 180° gives 491.
pub fn servo_duty(angle: ServoAngle) -> DutyCycle {
    let ticks = servo_pulse_us(angle) * (MAX_TICKS as u32 + 1) / SERVO_PERIOD_US;
    DutyCycle::pulse(ticks as u16)
}

impl<I2C: I2c> Pca9685<I2C> {
    /// Drives a motor at a signed speed (nominally -255..=255).
    ///
    /// Values beyond ±255 saturate at full duty. Returns the direction that
    /// was applied.
    pub fn run_motor(&mut self, port: MotorPort, speed: i32) -> Result<Direction, PwmError<I2C::Error>> {
        let (forward_ch, reverse_ch) = port.channels();
        let (forward, reverse) = motor_duties(speed);
        debug!(
            "motor {}: speed {} -> fwd {} / rev {}",
            port,
            speed,
            forward.off(),
            reverse.off()
        );
        self.set_pwm(forward_ch, forward)?;
        self.set_pwm(reverse_ch, reverse)?;
        Ok(Direction::from_speed(speed))
    }

    /// Stops one motor (both channels off).
    pub fn stop_motor(&mut self, port: MotorPort) -> Result<(), PwmError<I2C::Error>> {
        self.run_motor(port, 0).map(|_| ())
    }

    /// Stops all four motors. Servo channels are left alone.
    pub fn stop_all_motors(&mut self) -> Result<(), PwmError<I2C::Error>> {
        for port in MotorPort::ALL {
            self.stop_motor(port)?;
        }
        Ok(())
    }

    /// Moves a servo to an angle.
    pub fn set_servo(&mut self, port: ServoPort, angle: ServoAngle) -> Result<(), PwmError<I2C::Error>> {
        let duty = servo_duty(angle);
        debug!("servo {}: {} deg -> {} ticks", port, angle.degrees(), duty.off());
        self.set_pwm(port.channel(), duty)
    }
}
