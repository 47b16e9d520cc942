//! Parameters structure for the arm

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the arm.
///
/// Joint angles are logical servo angles in degrees, see [`crate::servo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmParams {
    // ---- GEOMETRY ----

    /// The length of the inner link, driven by the `a` servo.
    ///
    /// Units: millimeters.
    pub inner_length: f64,

    /// The length of the outer link, driven by the `b` servo.
    ///
    /// Units: millimeters.
    pub outer_length: f64,

    /// `a` servo angle when the inner link is vertical.
    ///
    /// Units: degrees
    pub a_vertical: f64,

    /// `b` servo angle when the outer link is vertical.
    ///
    /// Units: degrees
    pub b_vertical: f64,

    // ---- CAPABILITIES ----

    /// How far below vertical the `a` servo may go, bound is `a_vertical - a_min_from_vertical`.
    ///
    /// Units: degrees
    pub a_min_from_vertical: f64,

    /// How far above vertical the `a` servo may go, bound is `a_vertical + a_max_from_vertical`.
    ///
    /// Units: degrees
    pub a_max_from_vertical: f64,

    /// How far below vertical the `b` servo may go, bound is `b_vertical - b_min_from_vertical`.
    ///
    /// Units: degrees
    pub b_min_from_vertical: f64,

    /// How far above vertical the `b` servo may go, bound is `b_vertical + b_max_from_vertical`.
    ///
    /// Units: degrees
    pub b_max_from_vertical: f64,

    /// Bounds of the base rotation servo.
    ///
    /// Units: degrees
    pub rotation_bounds: [f64; 2],

    /// Bounds of the claw servo.
    ///
    /// Units: degrees
    pub claw_bounds: [f64; 2],

    // ---- CLAW ----

    /// Claw angle when open.
    ///
    /// Units: degrees
    pub claw_open_angle: f64,

    /// Angle the claw is driven to before zero when closing, taking up slack in the mechanism.
    ///
    /// Units: degrees
    pub claw_close_overshoot_angle: f64,

    // ---- WIRING ----

    /// PWM channels of each servo.
    pub channels: ChannelMap,
}

/// PWM channel of each servo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub rotation: u8,
    pub a: u8,
    pub b: u8,
    pub claw: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ArmParams {
    fn default() -> Self {
        Self {
            inner_length: 134.5,
            outer_length: 148.0,
            a_vertical: -63.0,
            b_vertical: -15.0,
            a_min_from_vertical: 7.0,
            a_max_from_vertical: 78.0,
            b_min_from_vertical: -10.0,
            b_max_from_vertical: 97.0,
            rotation_bounds: [-85.0, 85.0],
            claw_bounds: [-85.0, 85.0],
            claw_open_angle: 70.0,
            claw_close_overshoot_angle: -1.0,
            channels: ChannelMap::default(),
        }
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            rotation: 0,
            b: 1,
            a: 2,
            claw: 3,
        }
    }
}

impl ArmParams {
    /// Bounds of the `a` servo derived from its vertical reference.
    pub fn a_bounds(&self) -> (f64, f64) {
        (
            self.a_vertical - self.a_min_from_vertical,
            self.a_vertical + self.a_max_from_vertical,
        )
    }

    /// Bounds of the `b` servo derived from its vertical reference.
    pub fn b_bounds(&self) -> (f64, f64) {
        (
            self.b_vertical - self.b_min_from_vertical,
            self.b_vertical + self.b_max_from_vertical,
        )
    }

    /// Furthest distance from the shoulder the arm can reach.
    pub fn max_reach(&self) -> f64 {
        self.inner_length + self.outer_length
    }

    /// Closest distance to the shoulder the arm can reach.
    pub fn min_reach(&self) -> f64 {
        (self.inner_length - self.outer_length).abs()
    }
}
