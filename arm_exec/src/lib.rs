//! # Robot Arm Library
//!
//! Kinematics and servo control for a two link robot arm with a rotating base and a claw.
//!
//! # Architecture
//!
//! - `pwm`: the boards generating servo pulses, behind the `PwmDriver` trait
//! - `timer`: deferred completion callbacks
//! - `servo`: logical angle to pulse conversion and bounds enforcement for one joint
//! - `arm_ctrl`: the four servos of the arm and the inverse kinematics solver
//! - `cmd`: the operator's text commands and their execution against the arm

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod arm_ctrl;
pub mod cmd;
pub mod params;
pub mod pwm;
pub mod servo;
pub mod timer;
