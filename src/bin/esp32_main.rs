//! ESP32-C3 SuperMini smart farm demo.
//!
//! Runs a 1 Hz loop that:
//! - Reads temperature and humidity from the DHT11
//! - Pings the sonar and feeds the proximity vote
//! - Runs the conveyor motor (M1A) unless something is near
//! - Opens the vent servo (S1) when it gets warm
//!
//! # Build
//!
//! ```bash
//! cargo build --release --features esp32 --bin esp32_main
//! espflash flash --monitor target/riscv32imc-esp-espidf/release/esp32_main
//! ```

use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::log::EspLogger;
use log::{info, warn};
use smartfarm_kit::hal::esp32::{pins, Esp32Clock};
use smartfarm_kit::{
    BlockCommand, Config, HcSr04, MotorPort, ServoAngle, ServoPort, SmartFarmKit,
};

/// Main loop interval in milliseconds
const LOOP_INTERVAL_MS: u32 = 1_000;

/// Conveyor speed (block units, -255..=255)
const CONVEYOR_SPEED: i32 = 180;

/// Obstacle distance that pauses the conveyor
const NEAR_THRESHOLD_CM: u32 = 15;

/// Vent opens at or above this temperature
const VENT_OPEN_C: f32 = 28.0;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();

    info!("smartfarm-kit starting");

    let config = Config::default();
    let peripherals = Peripherals::take()?;

    // =========================================================================
    // PCA9685 on I2C (GPIO8/9)
    // =========================================================================
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(pins::I2C_BAUDRATE_HZ.Hz()),
    )?;
    let mut kit = SmartFarmKit::new(i2c, Ets, Esp32Clock::new(), config.clone());
    kit.stop_all()
        .map_err(|e| anyhow::anyhow!("PCA9685 init failed: {}", e))?;
    info!(
        "[OK] PCA9685 @ {:#04x}, prescale {}",
        config.pwm.address,
        kit.expander_mut()
            .prescale()
            .map_err(|e| anyhow::anyhow!("{}", e))?
    );

    // =========================================================================
    // Sonar (GPIO2 trigger, GPIO3 echo)
    // =========================================================================
    let mut sonar = HcSr04::new(
        PinDriver::output(peripherals.pins.gpio2)?,
        PinDriver::input(peripherals.pins.gpio3)?,
        Ets,
        Esp32Clock::new(),
        config.sonar.clone(),
    );
    info!("[OK] Sonar initialized (GPIO{}/{})", pins::SONAR_TRIG, pins::SONAR_ECHO);

    // =========================================================================
    // DHT11 (GPIO4, open-drain)
    // =========================================================================
    let mut dht_pin = PinDriver::input_output_od(peripherals.pins.gpio4)?;
    dht_pin.set_high()?;
    let mut dht = kit.dht_sensor(dht_pin);
    info!("[OK] DHT initialized (GPIO{})", pins::DHT_DATA);

    let vent = ServoPort::new(1)?;
    let mut conveyor_running = false;

    loop {
        // Climate
        match kit.read_dht(&mut dht) {
            Ok(reading) => {
                info!(
                    "climate: {:.1} C, {:.0} %RH",
                    reading.temperature_c, reading.humidity_pct
                );
                let angle = if reading.temperature_c >= VENT_OPEN_C { 90 } else { 0 };
                if let Err(e) = kit.servo(vent, ServoAngle::new(angle)?) {
                    warn!("vent: {}", e);
                }
            }
            Err(e) => warn!("climate: {}", e),
        }

        // Obstacle check
        let near = match kit.sonar_track(&mut sonar, NEAR_THRESHOLD_CM) {
            Ok(near) => near,
            Err(e) => {
                warn!("sonar: {:?}", e);
                true
            }
        };

        let command = if near {
            BlockCommand::StopMotor(MotorPort::M1A)
        } else {
            BlockCommand::MotorRun {
                port: MotorPort::M1A,
                speed: CONVEYOR_SPEED,
            }
        };
        if near == conveyor_running {
            match kit.apply_command(command) {
                Ok(outcome) => {
                    conveyor_running = !near;
                    info!("{} -> {:?}", command, outcome);
                }
                Err(e) => warn!("{}: {}", command, e),
            }
        }

        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}
