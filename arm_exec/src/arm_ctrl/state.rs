//! Implementations for the Arm structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info};
use std::sync::Arc;

// Internal
use super::{ArmParams, ArmStatus, Joint};
use crate::pwm::SharedDriver;
use crate::servo::{Servo, ServoCalibration, ServoConfig, ServoError};
use crate::timer::{Callback, Timer};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The whole arm.
///
/// The servos are reference counted only so that completion callbacks can hold on to them, the
/// arm is their sole owner otherwise.
pub struct Arm {
    pub(crate) params: ArmParams,

    pub(crate) rotation: Arc<Servo>,

    pub(crate) a: Arc<Servo>,

    pub(crate) b: Arc<Servo>,

    pub(crate) claw: Arc<Servo>,
}

/// Fixed-angle shortcuts for single joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Back,
    Forward,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Arm {
    /// Assemble the arm, creating its four servos.
    pub fn new(
        params: &ArmParams,
        calib: &ServoCalibration,
        driver: SharedDriver,
        timer: Arc<dyn Timer>,
    ) -> Result<Self, ServoError> {
        let (a_min, a_max) = params.a_bounds();
        let (b_min, b_max) = params.b_bounds();

        let servo = |config: ServoConfig| -> Result<Arc<Servo>, ServoError> {
            Ok(Arc::new(Servo::new(config, calib.clone(), driver.clone(), timer.clone())?))
        };

        let arm = Self {
            rotation: servo(ServoConfig::new(
                params.channels.rotation,
                "rot",
                params.rotation_bounds[0],
                params.rotation_bounds[1],
            ))?,
            a: servo(ServoConfig::new(params.channels.a, "a", a_min, a_max))?,
            b: servo(ServoConfig::new(params.channels.b, "b", b_min, b_max))?,
            claw: servo(ServoConfig::new(
                params.channels.claw,
                "claw",
                params.claw_bounds[0],
                params.claw_bounds[1],
            ))?,
            params: params.clone(),
        };

        debug!("Arm assembled with {:#?}", arm.params);

        Ok(arm)
    }

    pub fn params(&self) -> &ArmParams {
        &self.params
    }

    /// Get the servo driving a joint.
    pub fn servo(&self, joint: Joint) -> &Arc<Servo> {
        match joint {
            Joint::Rotation => &self.rotation,
            Joint::A => &self.a,
            Joint::B => &self.b,
            Joint::Claw => &self.claw,
        }
    }

    /// Move a single joint, see [`Servo::set_angle`].
    pub fn set_joint_angle(
        &self,
        joint: Joint,
        angle: f64,
        on_complete: Option<Callback>,
    ) -> Result<f64, ServoError> {
        self.servo(joint).set_angle(angle, on_complete)
    }

    /// Open the claw, returning the estimated duration of the move.
    pub fn open_claw(&self, on_complete: Option<Callback>) -> Result<f64, ServoError> {
        self.claw.set_angle(self.params.claw_open_angle, on_complete)
    }

    /// Close the claw.
    ///
    /// The claw is driven slightly past zero first so that it fully closes against the slack
    /// in the mechanism.
    pub fn close_claw(&self) -> Result<(), ServoError> {
        close(&self.claw, self.params.claw_close_overshoot_angle)
    }

    /// Open the claw and close it again once it's open.
    pub fn greet(&self) -> Result<(), ServoError> {
        let claw = self.claw.clone();
        let overshoot = self.params.claw_close_overshoot_angle;

        self.open_claw(Some(Box::new(move || {
            if let Err(e) = close(&claw, overshoot) {
                error!("Could not close the claw after greeting: {}", e);
            }
        })))?;

        Ok(())
    }

    /// Move every servo back to its zero angle.
    pub fn reset_servos(&self) -> Result<(), ServoError> {
        self.rotation.set_angle(0.0, None)?;
        self.claw.set_angle(0.0, None)?;
        self.a.set_angle(0.0, None)?;
        self.b.set_angle(0.0, None)?;

        Ok(())
    }

    /// Remove holding torque from every servo.
    pub fn rest_servos(&self) -> Result<(), ServoError> {
        self.rotation.rest()?;
        self.a.rest()?;
        self.b.rest()?;
        self.claw.rest()?;

        Ok(())
    }

    /// Move a joint to a fixed angle, resting it once the move is complete.
    pub fn nudge(&self, direction: Direction) -> Result<f64, ServoError> {
        let (joint, angle) = direction.target();
        let servo = self.servo(joint).clone();
        let rest_servo = servo.clone();

        servo.set_angle(angle, Some(Box::new(move || {
            if let Err(e) = rest_servo.rest() {
                error!("Could not rest [{}] after moving: {}", rest_servo.name(), e);
            }
        })))
    }

    /// Get the status of every servo.
    pub fn status(&self) -> ArmStatus {
        ArmStatus {
            rotation: self.rotation.status(),
            a: self.a.status(),
            b: self.b.status(),
            claw: self.claw.status(),
        }
    }
}

impl Direction {
    /// The joint moved and the angle it's moved to.
    pub fn target(&self) -> (Joint, f64) {
        match self {
            Direction::Up => (Joint::B, 80.0),
            Direction::Down => (Joint::B, 0.0),
            Direction::Left => (Joint::Rotation, -80.0),
            Direction::Right => (Joint::Rotation, 80.0),
            Direction::Back => (Joint::A, -70.0),
            Direction::Forward => (Joint::A, 0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn close(claw: &Servo, overshoot_angle: f64) -> Result<(), ServoError> {
    claw.set_angle(overshoot_angle, None)?;
    claw.set_angle(0.0, None)?;

    info!("Claw closed");

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::{ArmError, UnreachableKind};
    use crate::pwm::SimDriver;
    use crate::timer::ManualTimer;
    use std::sync::Mutex;

    struct Rig {
        sim: Arc<Mutex<SimDriver>>,
        timer: Arc<ManualTimer>,
        arm: Arm,
    }

    fn rig() -> Rig {
        let sim = Arc::new(Mutex::new(SimDriver::new()));
        let timer = Arc::new(ManualTimer::new());
        let arm = Arm::new(
            &ArmParams::default(),
            &ServoCalibration::default(),
            sim.clone(),
            timer.clone(),
        )
        .unwrap();

        Rig { sim, timer, arm }
    }

    #[test]
    fn test_assembly() {
        let r = rig();
        let status = r.arm.status();

        assert_eq!((status.a.min_angle, status.a.max_angle), (-70.0, 15.0));
        assert_eq!((status.b.min_angle, status.b.max_angle), (-5.0, 82.0));
        assert_eq!((status.rotation.channel, status.b.channel), (0, 1));
        assert_eq!((status.a.channel, status.claw.channel), (2, 3));
        assert!(status.servos().iter().all(|s| s.current_angle.is_none()));
        assert!(r.sim.lock().unwrap().writes().is_empty());
    }

    #[test]
    fn test_reset_servos() {
        let r = rig();

        r.arm.set_joint_angle(Joint::Rotation, 45.0, None).unwrap();
        r.arm.set_joint_angle(Joint::B, 60.0, None).unwrap();
        r.arm.reset_servos().unwrap();

        let status = r.arm.status();
        assert!(status.servos().iter().all(|s| s.current_angle == Some(0.0)));

        // Written in order rot, claw, a, b
        let channels: Vec<u8> = r.sim.lock().unwrap().writes()[2..]
            .iter()
            .map(|w| w.channel)
            .collect();
        assert_eq!(channels, vec![0, 3, 2, 1]);
    }

    #[test]
    fn test_rest_servos() {
        let r = rig();

        r.arm.reset_servos().unwrap();
        r.arm.rest_servos().unwrap();

        let status = r.arm.status();
        assert!(status.servos().iter().all(|s| s.rested && s.current_angle == Some(0.0)));
        for ch in 0..4 {
            assert_eq!(r.sim.lock().unwrap().last_pulse(ch), Some(0));
        }
    }

    #[test]
    fn test_claw() {
        let r = rig();

        r.arm.open_claw(None).unwrap();
        assert_eq!(r.arm.status().claw.current_angle, Some(70.0));

        r.arm.close_claw().unwrap();
        assert_eq!(r.arm.status().claw.current_angle, Some(0.0));

        // Two writes to close, overshooting first
        let claw_writes = r.sim.lock().unwrap().writes_to(3);
        let pulses: Vec<u16> = claw_writes.iter().map(|w| w.off_tick).collect();
        assert_eq!(pulses, vec![571, 372, 375]);

        // Closing from any angle ends at zero
        for angle in [-85.0, -1.0, 0.0, 33.0, 85.0].iter().copied() {
            r.arm.set_joint_angle(Joint::Claw, angle, None).unwrap();
            r.arm.close_claw().unwrap();
            assert_eq!(r.arm.status().claw.current_angle, Some(0.0));
        }
    }

    #[test]
    fn test_greet() {
        let r = rig();

        r.arm.greet().unwrap();
        assert_eq!(r.arm.status().claw.current_angle, Some(70.0));
        assert_eq!(r.timer.pending(), 1);

        r.timer.fire_all();
        assert_eq!(r.arm.status().claw.current_angle, Some(0.0));
    }

    #[test]
    fn test_nudge() {
        let r = rig();
        r.arm.reset_servos().unwrap();

        r.arm.nudge(Direction::Up).unwrap();
        assert_eq!(r.arm.status().b.current_angle, Some(80.0));
        assert!(!r.arm.status().b.rested);

        r.timer.fire_all();
        assert!(r.arm.status().b.rested);

        r.arm.nudge(Direction::Left).unwrap();
        r.timer.fire_all();
        assert_eq!(r.arm.status().rotation.current_angle, Some(-80.0));
        assert!(r.arm.status().rotation.rested);

        r.arm.nudge(Direction::Back).unwrap();
        assert_eq!(r.arm.status().a.current_angle, Some(-70.0));
    }

    #[test]
    fn test_move_to_reference_point() {
        let r = rig();
        r.arm.reset_servos().unwrap();

        let s = r.arm.move_to(150.0, 50.0).unwrap();
        let status = r.arm.status();

        let a = status.a.current_angle.unwrap();
        let b = status.b.current_angle.unwrap();
        assert!((a - (-63.0 + s.servo_angle_a)).abs() < 1e-9);
        assert!((b - (-15.0 + s.servo_angle_b)).abs() < 1e-9);
        assert!(r.arm.servo(Joint::A).is_within_bounds(a));
        assert!(r.arm.servo(Joint::B).is_within_bounds(b));

        // a then b
        let writes = r.sim.lock().unwrap().writes().to_vec();
        assert_eq!(writes[writes.len() - 2].channel, 2);
        assert_eq!(writes[writes.len() - 1].channel, 1);
    }

    #[test]
    fn test_move_to_failures_are_atomic() {
        let r = rig();
        r.arm.reset_servos().unwrap();
        let before = r.sim.lock().unwrap().writes().len();

        // Geometrically reachable, but `a` would need to go below its bound
        match r.arm.move_to(100.0, 100.0) {
            Err(ArmError::Unreachable { kind: UnreachableKind::ServoConstraint { servo, .. }, .. }) => {
                assert_eq!(servo, "a")
            }
            other => panic!("expected a servo constraint failure, got {:?}", other),
        }

        assert!(r.arm.move_to(0.0, 0.0).unwrap_err().is_unreachable());
        assert!(r.arm.move_to(300.0, 0.0).unwrap_err().is_unreachable());

        assert_eq!(r.sim.lock().unwrap().writes().len(), before);
        assert_eq!(r.arm.status().a.current_angle, Some(0.0));
        assert_eq!(r.arm.status().b.current_angle, Some(0.0));
    }
}
