//! Property tests for the actuator mappings, checksum rule and proximity vote.
//!
//! Runs on host only; proptest is not available for ESP32 targets.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;
use smartfarm_kit::{
    actuators::{motor_duties, servo_duty},
    config::ProximityConfig,
    dht::{checksum, verify},
    hal::{MockI2c, MockTimer},
    sonar::ProximityFilter,
    Config, DhtError, MotorPort, ServoAngle, SmartFarmKit,
};

proptest! {
    /// Exactly one channel of the pair carries min(4095, |speed| * 16),
    /// and the sign picks which.
    #[test]
    fn motor_one_channel_active(speed in -255i32..=255) {
        let (forward, reverse) = motor_duties(speed);
        let expected = (speed.unsigned_abs() * 16).min(4095) as u16;

        if speed > 0 {
            prop_assert_eq!(forward.off(), expected);
            prop_assert_eq!(reverse.off(), 0);
        } else if speed < 0 {
            prop_assert_eq!(forward.off(), 0);
            prop_assert_eq!(reverse.off(), expected);
        } else {
            prop_assert_eq!(forward.off(), 0);
            prop_assert_eq!(reverse.off(), 0);
        }
        prop_assert_eq!(forward.on(), 0);
        prop_assert_eq!(reverse.on(), 0);
    }

    /// Speeds beyond the block range saturate instead of wrapping.
    #[test]
    fn motor_saturates(speed in any::<i32>()) {
        let (forward, reverse) = motor_duties(speed);
        prop_assert!(forward.off() <= 4095);
        prop_assert!(reverse.off() <= 4095);
    }

    /// Bus writes for a motor land on its own channel pair.
    #[test]
    fn motor_writes_stay_on_pair(index in 1i32..=4, speed in -255i32..=255) {
        let timer = MockTimer::new();
        let mut kit = SmartFarmKit::new(MockI2c::new(), timer.clone(), timer, Config::default());
        kit.motor_run_raw(index, 0).unwrap();
        kit.expander_mut().bus_mut().clear_writes();

        kit.motor_run_raw(index, speed).unwrap();
        let port = MotorPort::new(index).unwrap();
        let (a, b) = port.channels();
        let writes = kit.expander().bus().writes();
        prop_assert_eq!(writes.len(), 2);
        prop_assert_eq!(writes[0].1[0], 0x06 + 4 * a.index());
        prop_assert_eq!(writes[1].1[0], 0x06 + 4 * b.index());
    }

    /// Servo duty follows the integer formula.
    #[test]
    fn servo_duty_formula(degrees in 0i32..=180) {
        let duty = servo_duty(ServoAngle::new(degrees).unwrap()).off() as i32;
        prop_assert_eq!(duty, ((degrees * 1800 / 180 + 600) * 4096) / 20000);
        prop_assert!((122..=491).contains(&duty));
    }

    /// Checksum is the sum modulo 512 then 256.
    #[test]
    fn checksum_rule(data in any::<[u8; 4]>(), fifth in any::<u8>()) {
        let sum: u32 = data.iter().map(|&b| b as u32).sum();
        let expected = ((sum % 512) % 256) as u8;
        prop_assert_eq!(checksum(&data), expected);

        let frame = [data[0], data[1], data[2], data[3], fifth];
        let ok = verify::<()>(&frame).is_ok();
        prop_assert_eq!(ok, fifth == expected);
        if !ok {
            let is_checksum_error = matches!(verify::<()>(&frame), Err(DhtError::Checksum { .. }));
            prop_assert!(is_checksum_error);
        }
    }

    /// The window always holds exactly the last ten samples.
    #[test]
    fn proximity_window_is_last_ten(distances in proptest::collection::vec(0u32..40, 0..40)) {
        let mut filter = ProximityFilter::new(ProximityConfig::default());
        let mut near = false;
        for &d in &distances {
            near = filter.update(d, 20);
        }

        let mut expected: Vec<bool> = vec![false; 10];
        expected.extend(distances.iter().map(|&d| d <= 20));
        let expected = expected.split_off(expected.len() - 10);

        let window: Vec<bool> = filter.samples().collect();
        prop_assert_eq!(&window, &expected);

        let hits = expected.iter().filter(|&&h| h).count();
        prop_assert_eq!(filter.hits(), hits);
        if !distances.is_empty() {
            prop_assert_eq!(near, hits >= 5);
        }
    }
}
