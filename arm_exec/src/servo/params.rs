//! Calibration and configuration structures for servos

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::ServoError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Calibration shared by every servo of the arm.
///
/// These are properties of the servo model and driver board rather than of
/// the arm geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoCalibration {
    /// Pulse sent at the most negative end of the servo's travel.
    ///
    /// Units: ticks out of `pulse_resolution`
    pub pulse_min: f64,

    /// Pulse sent at the most positive end of the servo's travel.
    ///
    /// Units: ticks out of `pulse_resolution`
    pub pulse_max: f64,

    /// Number of ticks in one PWM period.
    pub pulse_resolution: u16,

    /// Logical angle which maps onto `pulse_max` (and its negative onto
    /// `pulse_min`).
    ///
    /// Units: degrees
    pub degree_scale: f64,

    /// Estimated time the servo takes to travel one degree.
    ///
    /// Units: seconds/degree
    pub seconds_per_degree: f64,

    /// Shortest move duration ever reported.
    ///
    /// Units: seconds
    pub min_delay_s: f64,

    /// Distance assumed for the first move of a servo, whose starting
    /// position is unknown.
    ///
    /// Units: degrees
    pub first_move_delta_deg: f64,
}

/// Per-servo configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    /// Channel on the PWM driver.
    pub channel: u8,

    /// Name used in logs and errors.
    pub name: String,

    /// Lowest allowed logical angle (inclusive).
    ///
    /// Units: degrees
    pub min_angle: f64,

    /// Highest allowed logical angle (inclusive).
    ///
    /// Units: degrees
    pub max_angle: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            pulse_min: 150.0,
            pulse_max: 600.0,
            pulse_resolution: 4096,
            degree_scale: 80.0,
            seconds_per_degree: 0.01,
            min_delay_s: 0.01,
            first_move_delta_deg: 170.0,
        }
    }
}

impl ServoCalibration {
    /// Pulse for logical angle 0.
    pub fn zero_pulse(&self) -> f64 {
        (self.pulse_min + self.pulse_max) / 2.0
    }

    /// Estimated time to travel `delta_deg` degrees.
    pub fn move_duration_s(&self, delta_deg: f64) -> f64 {
        (delta_deg.abs() * self.seconds_per_degree).max(self.min_delay_s)
    }

    /// Check the calibration describes a usable pulse range.
    pub fn validate(&self, name: &str) -> Result<(), ServoError> {
        let invalid = |reason: &str| Err(ServoError::InvalidConfig {
            name: name.to_string(),
            reason: reason.to_string(),
        });

        if !(self.pulse_min >= 0.0 && self.pulse_min < self.pulse_max) {
            return invalid("pulse_min must be non-negative and less than pulse_max");
        }
        if self.pulse_max >= self.pulse_resolution as f64 {
            return invalid("pulse_max must be less than the pulse resolution");
        }
        if !(self.degree_scale > 0.0) {
            return invalid("degree_scale must be positive");
        }
        if !(self.seconds_per_degree >= 0.0 && self.min_delay_s >= 0.0) {
            return invalid("move timings must not be negative");
        }

        Ok(())
    }
}

impl ServoConfig {
    pub fn new(channel: u8, name: &str, min_angle: f64, max_angle: f64) -> Self {
        Self {
            channel,
            name: name.to_string(),
            min_angle,
            max_angle,
        }
    }

    /// Check the bounds are ordered and finite.
    pub fn validate(&self) -> Result<(), ServoError> {
        if !(self.min_angle.is_finite() && self.max_angle.is_finite())
            || self.min_angle > self.max_angle
        {
            return Err(ServoError::InvalidConfig {
                name: self.name.clone(),
                reason: format!(
                    "bounds [{}, {}] are not an ordered range",
                    self.min_angle, self.max_angle
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_move_duration() {
        let calib = ServoCalibration::default();

        assert_eq!(calib.zero_pulse(), 375.0);
        assert!((calib.move_duration_s(170.0) - 1.7).abs() < 1e-12);
        assert!((calib.move_duration_s(-10.0) - 0.1).abs() < 1e-12);
        assert_eq!(calib.move_duration_s(0.0), 0.01);
        assert_eq!(calib.move_duration_s(0.5), 0.01);
    }

    #[test]
    fn test_validate() {
        assert!(ServoCalibration::default().validate("a").is_ok());

        let calib = ServoCalibration {
            pulse_min: 600.0,
            pulse_max: 150.0,
            ..Default::default()
        };
        assert!(calib.validate("a").is_err());

        let calib = ServoCalibration {
            pulse_max: 5000.0,
            ..Default::default()
        };
        assert!(calib.validate("a").is_err());

        assert!(ServoConfig::new(0, "rot", -85.0, 85.0).validate().is_ok());
        assert!(ServoConfig::new(0, "rot", 85.0, -85.0).validate().is_err());
        assert!(ServoConfig::new(0, "rot", f64::NAN, 85.0).validate().is_err());
    }
}
