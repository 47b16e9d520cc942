//! Arm control module
//!
//! The arm has a rotating base, a two link boom driven by the `a` (shoulder) and `b` (elbow)
//! servos, and a claw.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod inverse_kinematics;
mod params;
mod state;
mod status;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use inverse_kinematics::*;
pub use params::*;
pub use state::*;
pub use status::*;

use crate::servo::ServoError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during arm operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArmError {
    #[error("Cannot move to ({x}, {y}): {kind}")]
    Unreachable {
        x: f64,
        y: f64,
        kind: UnreachableKind,
    },

    #[error(transparent)]
    Servo(#[from] ServoError),
}

/// Reasons a cartesian target can't be reached.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnreachableKind {
    #[error("the target is not a finite point")]
    NonFinite,

    #[error("the origin has no reach direction")]
    Origin,

    #[error(
        "out of physical range, distance {distance:.3} is not within \
         [{min_reach:.3}, {max_reach:.3}]"
    )]
    OutOfRange {
        distance: f64,
        min_reach: f64,
        max_reach: f64,
    },

    #[error("out of range due to servo constraints ([{servo}] would need {angle:.3} deg)")]
    ServoConstraint { servo: String, angle: f64 },
}

/// The servos of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    Rotation,
    A,
    B,
    Claw,
}

impl ArmError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ArmError::Unreachable { .. })
    }
}
