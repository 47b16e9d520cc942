//! Arm status structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::servo::ServoStatus;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stores the state of every servo of the arm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmStatus {
    pub rotation: ServoStatus,
    pub a: ServoStatus,
    pub b: ServoStatus,
    pub claw: ServoStatus,
}

impl ArmStatus {
    /// All servos, in the order they are reset.
    pub fn servos(&self) -> [&ServoStatus; 4] {
        [&self.rotation, &self.claw, &self.a, &self.b]
    }
}
