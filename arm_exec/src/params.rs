//! # Arm Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::arm_ctrl::ArmParams;
use crate::pwm::pca9685::DEFAULT_ADDRESS;
use crate::servo::ServoCalibration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// All parameters of the arm executable, loaded from `arm_exec.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecParams {
    pub driver: DriverParams,

    pub servo: ServoCalibration,

    pub arm: ArmParams,
}

/// Parameters of the PWM driver board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverParams {
    /// Which driver to use.
    pub kind: DriverKind,

    /// I2C address of the board.
    pub i2c_address: u8,

    /// PWM frequency set at start up.
    ///
    /// Units: hertz
    pub frequency_hz: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Adafruit PCA9685 board on the Raspberry Pi's I2C bus.
    Pca9685,

    /// No hardware, writes are only logged.
    Sim,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DriverParams {
    fn default() -> Self {
        Self {
            kind: DriverKind::Pca9685,
            i2c_address: DEFAULT_ADDRESS,
            frequency_hz: 60.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params: ExecParams = util::params::from_str(
            r#"
            [driver]
            kind = "sim"
            frequency_hz = 50.0

            [servo]
            degree_scale = 90.0

            [arm]
            inner_length = 100.0
            claw_bounds = [-60.0, 60.0]

            [arm.channels]
            rotation = 4
            a = 5
            b = 6
            claw = 7
            "#,
        )
        .unwrap();

        assert_eq!(params.driver.kind, DriverKind::Sim);
        assert_eq!(params.driver.i2c_address, 0x40);
        assert_eq!(params.driver.frequency_hz, 50.0);
        assert_eq!(params.servo.degree_scale, 90.0);
        assert_eq!(params.servo.pulse_min, 150.0);
        assert_eq!(params.arm.inner_length, 100.0);
        assert_eq!(params.arm.outer_length, 148.0);
        assert_eq!(params.arm.claw_bounds, [-60.0, 60.0]);
        assert_eq!(params.arm.channels.claw, 7);
    }

    #[test]
    fn test_empty_params_are_default() {
        let params: ExecParams = util::params::from_str("").unwrap();
        assert_eq!(params, ExecParams::default());
    }
}
