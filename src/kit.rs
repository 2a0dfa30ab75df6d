//! Block-level facade over the whole kit.
//!
//! [`SmartFarmKit`] owns the expander handle, the delay and clock, and the
//! proximity window, and exposes the operations a block program uses:
//! running motors, moving servos, ranging, proximity tracking and reading
//! the temperature sensor.
//!
//! The expander is initialized lazily by the first actuator call. Numeric
//! block arguments are validated before that happens, so a rejected call
//! never touches the bus.
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::{SmartFarmKit, MotorPort, ServoPort, ServoAngle};
//! use smartfarm_kit::config::Config;
//! use smartfarm_kit::hal::{MockI2c, MockSonar, MockTimer};
//!
//! let timer = MockTimer::new();
//! let mut kit = SmartFarmKit::new(MockI2c::new(), timer.clone(), timer, Config::default());
//! assert!(!kit.is_initialized());
//!
//! kit.motor_run(MotorPort::M1A, 200).unwrap();
//! kit.servo(ServoPort::new(1).unwrap(), ServoAngle::new(90).unwrap()).unwrap();
//! assert!(kit.is_initialized());
//!
//! let mut sonar = MockSonar::new();
//! sonar.queue_distance(25);
//! assert_eq!(kit.sonar_distance(&mut sonar).unwrap(), 25);
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use log::warn;

use crate::actuators::{motor_duties, servo_duty};
use crate::commands::{BlockCommand, BlockOutcome};
use crate::config::Config;
use crate::dht::{DhtReading, DhtSensor, DHT_SENTINEL};
use crate::error::{DhtError, PwmError};
use crate::pca9685::Pca9685;
use crate::ports::{MotorPort, ServoAngle, ServoPort};
use crate::sonar::ProximityFilter;
use crate::traits::{Clock, Direction, SonarRanger};

/// The kit: expander, time sources and proximity state.
pub struct SmartFarmKit<I2C, D, C> {
    expander: Pca9685<I2C>,
    delay: D,
    clock: C,
    proximity: ProximityFilter,
    config: Config,
}

impl<I2C, D, C> SmartFarmKit<I2C, D, C>
where
    I2C: I2c,
    D: DelayNs,
    C: Clock,
{
    /// Creates the kit. No bus traffic until the first actuator call.
    pub fn new(i2c: I2C, delay: D, clock: C, config: Config) -> Self {
        Self {
            expander: Pca9685::new(i2c, config.pwm.clone()),
            delay,
            clock,
            proximity: ProximityFilter::new(config.proximity.clone()),
            config,
        }
    }

    /// Returns the kit configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrows the expander handle.
    pub fn expander(&self) -> &Pca9685<I2C> {
        &self.expander
    }

    /// Mutably borrows the expander handle.
    pub fn expander_mut(&mut self) -> &mut Pca9685<I2C> {
        &mut self.expander
    }

    /// Returns true once the expander reset sequence has run.
    pub fn is_initialized(&self) -> bool {
        self.expander.is_initialized()
    }

    /// Returns the kit's clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Consumes the kit and returns the bus and time sources.
    pub fn release(self) -> (I2C, D, C) {
        (self.expander.release(), self.delay, self.clock)
    }

    fn ready(&mut self) -> Result<&mut Pca9685<I2C>, PwmError<I2C::Error>> {
        self.expander.ensure_initialized(&mut self.delay)?;
        Ok(&mut self.expander)
    }

    // ========================================================================
    // Actuators
    // ========================================================================

    /// Runs a motor at a signed speed (nominally -255..=255).
    pub fn motor_run(
        &mut self,
        port: MotorPort,
        speed: i32,
    ) -> Result<Direction, PwmError<I2C::Error>> {
        self.ready()?.run_motor(port, speed)
    }

    /// Runs a motor by block index (1-4).
    ///
    /// An index outside 1-4 is rejected before any bus traffic.
    pub fn motor_run_raw(
        &mut self,
        index: i32,
        speed: i32,
    ) -> Result<Direction, PwmError<I2C::Error>> {
        let port = MotorPort::new(index).inspect_err(|e| warn!("motor_run: {}", e))?;
        self.motor_run(port, speed)
    }

    /// Stops one motor.
    pub fn stop_motor(&mut self, port: MotorPort) -> Result<(), PwmError<I2C::Error>> {
        self.ready()?.stop_motor(port)
    }

    /// Stops all four motors.
    pub fn stop_all(&mut self) -> Result<(), PwmError<I2C::Error>> {
        self.ready()?.stop_all_motors()
    }

    /// Moves a servo.
    pub fn servo(&mut self, port: ServoPort, angle: ServoAngle) -> Result<(), PwmError<I2C::Error>> {
        self.ready()?.set_servo(port, angle)
    }

    /// Moves a servo by block index (1-8) and degrees (0-180).
    ///
    /// Out-of-range numbers are rejected before any bus traffic.
    pub fn servo_raw(&mut self, index: i32, degrees: i32) -> Result<(), PwmError<I2C::Error>> {
        let port = ServoPort::new(index).inspect_err(|e| warn!("servo: {}", e))?;
        let angle = ServoAngle::new(degrees).inspect_err(|e| warn!("servo: {}", e))?;
        self.servo(port, angle)
    }

    /// Applies a typed command and reports what was written.
    pub fn apply_command(
        &mut self,
        command: BlockCommand,
    ) -> Result<BlockOutcome, PwmError<I2C::Error>> {
        match command {
            BlockCommand::MotorRun { port, speed } => {
                let direction = self.motor_run(port, speed)?;
                let (forward, reverse) = motor_duties(speed);
                Ok(BlockOutcome::Motor {
                    port,
                    direction,
                    duty: forward.off().max(reverse.off()),
                })
            }
            BlockCommand::StopMotor(port) => {
                self.stop_motor(port)?;
                Ok(BlockOutcome::Motor {
                    port,
                    direction: Direction::Stopped,
                    duty: 0,
                })
            }
            BlockCommand::StopAllMotors => {
                self.stop_all()?;
                Ok(BlockOutcome::AllMotorsStopped)
            }
            BlockCommand::Servo { port, angle } => {
                self.servo(port, angle)?;
                Ok(BlockOutcome::Servo {
                    port,
                    angle,
                    duty: servo_duty(angle).off(),
                })
            }
        }
    }

    // ========================================================================
    // Sonar
    // ========================================================================

    /// One distance reading in centimeters (0 = no echo).
    pub fn sonar_distance<S: SonarRanger>(&mut self, sonar: &mut S) -> Result<u32, S::Error> {
        sonar.ping_cm()
    }

    /// Takes a reading, feeds it to the proximity window and returns the
    /// vote: true when enough of the last ten readings were within
    /// `threshold_cm`.
    pub fn sonar_track<S: SonarRanger>(
        &mut self,
        sonar: &mut S,
        threshold_cm: u32,
    ) -> Result<bool, S::Error> {
        let distance = sonar.ping_cm()?;
        Ok(self.proximity.update(distance, threshold_cm))
    }

    /// Borrows the proximity window.
    pub fn proximity(&self) -> &ProximityFilter {
        &self.proximity
    }

    /// Refills the proximity window with misses.
    pub fn reset_proximity(&mut self) {
        self.proximity.reset();
    }

    // ========================================================================
    // Temperature / Humidity
    // ========================================================================

    /// Wraps a data pin in a sensor using the kit's DHT configuration.
    pub fn dht_sensor<P>(&self, pin: P) -> DhtSensor<P>
    where
        P: InputPin + OutputPin,
    {
        DhtSensor::new(pin, self.config.dht.clone())
    }

    /// Full DHT reading.
    pub fn read_dht<P>(
        &mut self,
        sensor: &mut DhtSensor<P>,
    ) -> Result<DhtReading, DhtError<<P as ErrorType>::Error>>
    where
        P: InputPin + OutputPin,
    {
        sensor.read(&mut self.delay, &self.clock)
    }

    /// Temperature in degrees Celsius.
    pub fn read_temperature<P>(
        &mut self,
        sensor: &mut DhtSensor<P>,
    ) -> Result<f32, DhtError<<P as ErrorType>::Error>>
    where
        P: InputPin + OutputPin,
    {
        self.read_dht(sensor).map(|r| r.temperature_c)
    }

    /// Temperature, or [`DHT_SENTINEL`] if the read failed.
    pub fn read_temperature_or_sentinel<P>(&mut self, sensor: &mut DhtSensor<P>) -> f32
    where
        P: InputPin + OutputPin,
    {
        self.read_temperature(sensor).unwrap_or(DHT_SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeError;
    use crate::hal::{MockDhtLine, MockI2c, MockSonar, MockTimer};

    fn kit() -> (SmartFarmKit<MockI2c, MockTimer, MockTimer>, MockTimer) {
        let timer = MockTimer::new();
        let kit = SmartFarmKit::new(MockI2c::new(), timer.clone(), timer.clone(), Config::default());
        (kit, timer)
    }

    // =========================================================================
    // Lazy Initialization Tests
    // =========================================================================

    #[test]
    fn new_is_silent() {
        let (kit, _) = kit();
        assert!(!kit.is_initialized());
        assert!(kit.expander().bus().writes().is_empty());
    }

    #[test]
    fn first_actuator_call_initializes_once() {
        let (mut kit, _) = kit();
        kit.motor_run(MotorPort::M1A, 10).unwrap();
        // reset (22) + two channel writes
        assert_eq!(kit.expander().bus().writes().len(), 24);

        kit.motor_run(MotorPort::M1A, 20).unwrap();
        assert_eq!(kit.expander().bus().writes().len(), 26);
    }

    #[test]
    fn invalid_motor_index_touches_nothing() {
        let (mut kit, _) = kit();
        for index in [0, 5, -1] {
            assert!(matches!(
                kit.motor_run_raw(index, 100),
                Err(PwmError::OutOfRange(RangeError { value, .. })) if value == index
            ));
        }
        assert!(!kit.is_initialized());
        assert!(kit.expander().bus().writes().is_empty());
    }

    #[test]
    fn invalid_servo_touches_nothing() {
        let (mut kit, _) = kit();
        assert!(kit.servo_raw(9, 90).is_err());
        assert!(kit.servo_raw(1, 181).is_err());
        assert!(kit.expander().bus().writes().is_empty());
    }

    // =========================================================================
    // Command Tests
    // =========================================================================

    #[test]
    fn apply_motor_command() {
        let (mut kit, _) = kit();
        let outcome = kit
            .apply_command(BlockCommand::motor_run(2, -100).unwrap())
            .unwrap();
        assert_eq!(
            outcome,
            BlockOutcome::Motor {
                port: MotorPort::M1B,
                direction: Direction::Reverse,
                duty: 1600
            }
        );
    }

    #[test]
    fn apply_servo_command() {
        let (mut kit, _) = kit();
        let outcome = kit.apply_command(BlockCommand::servo(3, 0).unwrap()).unwrap();
        assert!(matches!(outcome, BlockOutcome::Servo { duty: 122, .. }));

        // S3 -> channel 10
        let (_, last) = kit.expander().bus().writes().last().unwrap();
        assert_eq!(last, &vec![0x06 + 40, 0, 0, 122, 0]);
    }

    #[test]
    fn apply_stop_all() {
        let (mut kit, _) = kit();
        kit.motor_run(MotorPort::M2B, 255).unwrap();
        assert_eq!(
            kit.apply_command(BlockCommand::StopAllMotors),
            Ok(BlockOutcome::AllMotorsStopped)
        );
        for ch in 0..8u8 {
            assert_eq!(kit.expander().bus().register(0x06 + 4 * ch + 2), 0);
        }
    }

    #[test]
    fn bus_failure_propagates() {
        let timer = MockTimer::new();
        let mut kit = SmartFarmKit::new(
            MockI2c::new().failing(),
            timer.clone(),
            timer,
            Config::default(),
        );
        assert!(matches!(
            kit.motor_run(MotorPort::M1A, 1),
            Err(PwmError::Bus(_))
        ));
        assert!(!kit.is_initialized());
    }

    // =========================================================================
    // Sonar Tests
    // =========================================================================

    #[test]
    fn sonar_track_votes() {
        let (mut kit, _) = kit();
        let mut sonar = MockSonar::new();
        sonar.queue_distances(&[5, 5, 5, 5, 50, 5]);

        let votes: Vec<bool> = (0..6)
            .map(|_| kit.sonar_track(&mut sonar, 10).unwrap())
            .collect();
        assert_eq!(votes, vec![false, false, false, false, false, true]);
        assert_eq!(kit.proximity().hits(), 5);

        kit.reset_proximity();
        assert_eq!(kit.proximity().hits(), 0);
    }

    // =========================================================================
    // DHT Tests
    // =========================================================================

    #[test]
    fn read_temperature_through_kit() {
        let (mut kit, timer) = kit();
        let mut dht = kit.dht_sensor(MockDhtLine::responding(&timer, [40, 0, 21, 50, 111]));
        let t = kit.read_temperature(&mut dht).unwrap();
        assert!((t - 21.5).abs() < 1e-4);
        // no expander traffic
        assert!(kit.expander().bus().writes().is_empty());
    }

    #[test]
    fn read_temperature_sentinel() {
        let (mut kit, timer) = kit();
        let mut dht = kit.dht_sensor(MockDhtLine::silent(&timer));
        assert_eq!(kit.read_temperature_or_sentinel(&mut dht), DHT_SENTINEL);
    }
}
