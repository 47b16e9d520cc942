//! # Arm commands
//!
//! The commands an operator can type at the arm's prompt, and their execution against an
//! [`Arm`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use structopt::{
    clap::{AppSettings, ErrorKind},
    StructOpt,
};
use thiserror::Error;

use crate::arm_ctrl::{Arm, ArmError, Direction, Joint};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for the arm.
#[derive(Debug, Clone, PartialEq, StructOpt)]
#[structopt(
    name = "arm",
    no_version,
    setting = AppSettings::NoBinaryName,
    global_settings = &[
        AppSettings::AllowNegativeNumbers,
        AppSettings::VersionlessSubcommands,
        AppSettings::DisableHelpSubcommand,
    ]
)]
pub enum ArmCmd {
    /// Set the angle of the base rotation servo
    #[structopt(name = "rot", visible_aliases = &["r", "rotation"])]
    Rotation {
        /// Angle in degrees
        angle: f64,
    },

    /// Set the angle of the `a` (shoulder) servo
    #[structopt(name = "a")]
    A {
        /// Angle in degrees
        angle: f64,
    },

    /// Set the angle of the `b` (elbow) servo
    #[structopt(name = "b")]
    B {
        /// Angle in degrees
        angle: f64,
    },

    /// Set the angle of the claw servo
    #[structopt(name = "claw", visible_alias = "c")]
    Claw {
        /// Angle in degrees
        angle: f64,
    },

    /// Move the head of the arm to a point
    #[structopt(name = "move", visible_alias = "go")]
    Move {
        /// Horizontal distance from the shoulder
        x: f64,

        /// Vertical distance from the shoulder
        y: f64,
    },

    /// Move every servo to its zero angle
    #[structopt(name = "reset")]
    Reset,

    /// Remove holding torque from every servo
    #[structopt(name = "rest", visible_aliases = &["d", "disable"])]
    Rest,

    /// Open the claw
    #[structopt(name = "open")]
    Open,

    /// Close the claw
    #[structopt(name = "close")]
    Close,

    /// Raise the elbow
    #[structopt(name = "up")]
    Up,

    /// Lower the elbow
    #[structopt(name = "down")]
    Down,

    /// Turn the base left
    #[structopt(name = "left")]
    Left,

    /// Turn the base right
    #[structopt(name = "right")]
    Right,

    /// Lean the shoulder back
    #[structopt(name = "back")]
    Back,

    /// Bring the shoulder forward
    #[structopt(name = "forward")]
    Forward,

    /// Wave the claw
    #[structopt(name = "greet", visible_aliases = &["hi", "hello"])]
    Greet,

    /// Show the state of every servo
    #[structopt(name = "status")]
    Status,

    /// Exit
    #[structopt(name = "quit", visible_alias = "q")]
    Quit,
}

/// What the prompt should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Possible parsing errors.
#[derive(Debug, Error, PartialEq)]
pub enum CmdParseError {
    #[error("{0}")]
    Help(String),

    #[error("Command '{0}' not recognized: {1}")]
    Invalid(String, String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmCmd {
    /// Parse a command from a line typed at the prompt.
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CmdParseError> {
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            [] => Ok(None),
            // `r` on its own is reset, with an angle it's rotation
            ["r"] => Ok(Some(ArmCmd::Reset)),
            _ => ArmCmd::from_iter_safe(words.iter().copied()).map(Some).map_err(|e| match e.kind {
                ErrorKind::HelpDisplayed => CmdParseError::Help(e.message),
                _ => CmdParseError::Invalid(line.trim().to_string(), e.message),
            }),
        }
    }

    /// Execute the command on the arm.
    pub fn execute(&self, arm: &Arm) -> Result<Outcome, ArmError> {
        match self {
            ArmCmd::Rotation { angle } => {
                arm.set_joint_angle(Joint::Rotation, *angle, None)?;
            }
            ArmCmd::A { angle } => {
                arm.set_joint_angle(Joint::A, *angle, None)?;
            }
            ArmCmd::B { angle } => {
                arm.set_joint_angle(Joint::B, *angle, None)?;
            }
            ArmCmd::Claw { angle } => {
                arm.set_joint_angle(Joint::Claw, *angle, None)?;
            }
            ArmCmd::Move { x, y } => {
                arm.move_to(*x, *y)?;
            }
            ArmCmd::Reset => {
                arm.reset_servos()?;
                info!("Servos reset");
            }
            ArmCmd::Rest => {
                arm.rest_servos()?;
                info!("Servos set to rest");
            }
            ArmCmd::Open => {
                info!("Opening claw");
                arm.open_claw(None)?;
            }
            ArmCmd::Close => {
                info!("Closing claw");
                arm.close_claw()?;
            }
            ArmCmd::Up => {
                arm.nudge(Direction::Up)?;
            }
            ArmCmd::Down => {
                arm.nudge(Direction::Down)?;
            }
            ArmCmd::Left => {
                arm.nudge(Direction::Left)?;
            }
            ArmCmd::Right => {
                arm.nudge(Direction::Right)?;
            }
            ArmCmd::Back => {
                arm.nudge(Direction::Back)?;
            }
            ArmCmd::Forward => {
                arm.nudge(Direction::Forward)?;
            }
            ArmCmd::Greet => {
                info!("Hello!");
                arm.greet()?;
            }
            ArmCmd::Status => match serde_json::to_string_pretty(&arm.status()) {
                Ok(s) => info!("{}", s),
                Err(e) => warn!("Could not serialise the arm status: {}", e),
            },
            ArmCmd::Quit => {
                info!("Goodbye!");
                return Ok(Outcome::Quit);
            }
        }

        Ok(Outcome::Continue)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
