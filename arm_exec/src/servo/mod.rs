//! Servo abstraction module
//!
//! A [`Servo`] owns the calibration of one physical joint and turns logical angles (degrees,
//! 0 being the middle of the servo's travel) into pulses on its PWM channel.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

use crate::pwm::PwmError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while commanding a servo.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServoError {
    #[error("Angle outside of [{name}]'s bounds: {min} <= {angle} <= {max}")]
    OutOfBounds {
        name: String,
        angle: f64,
        min: f64,
        max: f64,
    },

    #[error("[{name}] cannot be moved to a non-finite angle ({angle})")]
    InvalidAngle { name: String, angle: f64 },

    #[error("[{name}] has an invalid configuration: {reason}")]
    InvalidConfig { name: String, reason: String },

    #[error("Could not write to [{name}]'s PWM channel: {source}")]
    Hardware {
        name: String,
        #[source]
        source: PwmError,
    },
}
