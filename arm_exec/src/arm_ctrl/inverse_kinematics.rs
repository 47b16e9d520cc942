//! Arm inverse kinematics calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, error, info};
use serde::Serialize;

// Internal imports
use super::*;
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Solution of the inverse kinematics for a target point.
///
/// All angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IkSolution {
    /// Target x (horizontal distance from the shoulder).
    pub x: f64,

    /// Target y (vertical distance from the shoulder).
    pub y: f64,

    /// Straight line distance from the shoulder to the target.
    pub distance: f64,

    /// Elevation of the target seen from the shoulder.
    pub angle_from_horizontal: f64,

    /// Interior angle at the shoulder between the inner link and the target line.
    pub triangle_a: f64,

    /// Interior angle at the elbow between the two links.
    pub triangle_b: f64,

    /// `a` angle relative to its vertical reference.
    pub servo_angle_a: f64,

    /// `b` angle relative to its vertical reference.
    pub servo_angle_b: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Arm {
    /// Perform the inverse kinematics calculations for the target point `(x, y)`.
    ///
    /// The two links and the straight line from the shoulder to the target form a triangle whose
    /// sides are all known, the law of cosines gives its angles at the shoulder (`triangle_a`)
    /// and elbow (`triangle_b`). These are then turned into servo angles:
    ///
    /// ```text
    /// servo_angle_a = 90 - triangle_a - angle_from_horizontal
    /// servo_angle_b = triangle_b - servo_angle_a + angle_from_horizontal
    /// ```
    ///
    /// No servo is touched, and servo bounds are not checked.
    pub fn solve(&self, x: f64, y: f64) -> Result<IkSolution, ArmError> {
        solve(&self.params, x, y)
    }

    /// Move the head of the arm to `(x, y)`.
    ///
    /// Either both the `a` and `b` servos are commanded or, if the target can't be reached, none
    /// are.
    pub fn move_to(&self, x: f64, y: f64) -> Result<IkSolution, ArmError> {
        let solution = self.solve(x, y).map_err(|e| {
            error!("{}", e);
            e
        })?;

        debug!(
            "[Triangle] a: {}, b: {}, angle from horiz: {}",
            solution.triangle_a, solution.triangle_b, solution.angle_from_horizontal
        );

        let a_angle = self.params.a_vertical + solution.servo_angle_a;
        let b_angle = self.params.b_vertical + solution.servo_angle_b;

        // Check both before moving either
        for (servo, angle) in [(&self.a, a_angle), (&self.b, b_angle)].iter() {
            if !servo.is_within_bounds(*angle) {
                let e = ArmError::Unreachable {
                    x,
                    y,
                    kind: UnreachableKind::ServoConstraint {
                        servo: servo.name().to_string(),
                        angle: *angle,
                    },
                };
                error!("{}", e);
                return Err(e);
            }
        }

        self.a.set_angle(a_angle, None)?;
        self.b.set_angle(b_angle, None)?;

        info!(
            "Moved to ({}, {}) [Servos] a: {:.3}, b: {:.3}",
            x, y, solution.servo_angle_a, solution.servo_angle_b
        );

        Ok(solution)
    }
}

impl IkSolution {
    /// Compute the point the head reaches with this solution's servo angles.
    pub fn forward(&self, params: &ArmParams) -> (f64, f64) {
        forward(
            params,
            self.servo_angle_a,
            self.servo_angle_b,
            self.angle_from_horizontal,
        )
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the inverse kinematics for `(x, y)` with the given arm geometry.
pub fn solve(params: &ArmParams, x: f64, y: f64) -> Result<IkSolution, ArmError> {
    let unreachable = |kind| ArmError::Unreachable { x, y, kind };

    if !x.is_finite() || !y.is_finite() {
        return Err(unreachable(UnreachableKind::NonFinite));
    }

    let distance = maths::norm(&[0.0, 0.0], &[x, y]).unwrap_or(std::f64::NAN);
    if distance == 0.0 {
        return Err(unreachable(UnreachableKind::Origin));
    }

    let out_of_range = || unreachable(UnreachableKind::OutOfRange {
        distance,
        min_reach: params.min_reach(),
        max_reach: params.max_reach(),
    });

    let angle_from_horizontal = (y / distance).asin().to_degrees();

    let triangle_a = law_of_cosines(params.inner_length, distance, params.outer_length)
        .ok_or_else(out_of_range)?;
    let triangle_b = law_of_cosines(params.inner_length, params.outer_length, distance)
        .ok_or_else(out_of_range)?;

    let servo_angle_a = 90.0 - triangle_a - angle_from_horizontal;
    let servo_angle_b = triangle_b - servo_angle_a + angle_from_horizontal;

    Ok(IkSolution {
        x,
        y,
        distance,
        angle_from_horizontal,
        triangle_a,
        triangle_b,
        servo_angle_a,
        servo_angle_b,
    })
}

/// Compute the head position from the `a` and `b` angles relative to their vertical references.
///
/// The inner link is at `90 - servo_angle_a` degrees from horizontal. The elbow's interior angle
/// is recovered from the `b` command as `servo_angle_b + servo_angle_a - angle_from_horizontal`
/// and the outer link is folded back from the inner link by it.
pub fn forward(
    params: &ArmParams,
    servo_angle_a: f64,
    servo_angle_b: f64,
    angle_from_horizontal: f64,
) -> (f64, f64) {
    let elbow = servo_angle_b + servo_angle_a - angle_from_horizontal;

    let inner_rad = (90.0 - servo_angle_a).to_radians();
    let outer_rad = inner_rad + (elbow - 180.0).to_radians();

    (
        params.inner_length * inner_rad.cos() + params.outer_length * outer_rad.cos(),
        params.inner_length * inner_rad.sin() + params.outer_length * outer_rad.sin(),
    )
}

/// Angle (degrees) opposite side `c` of a triangle with sides `a`, `b` and `c`.
///
/// Returns `None` if the sides can't form a triangle.
pub fn law_of_cosines(a: f64, b: f64, c: f64) -> Option<f64> {
    let cos_c = (c.powi(2) - a.powi(2) - b.powi(2)) / (-2.0 * a * b);

    if (-1.0..=1.0).contains(&cos_c) {
        Some(cos_c.acos().to_degrees())
    }
    else {
        None
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pwm::SimDriver;
    use crate::servo::ServoCalibration;
    use crate::timer::ManualTimer;
    use std::sync::{Arc, Mutex};

    const REACHABLE: [(f64, f64); 5] = [
        (150.0, 50.0),
        (200.0, 0.0),
        (180.0, 30.0),
        (160.0, 20.0),
        (150.0, -20.0),
    ];

    #[test]
    fn test_law_of_cosines() {
        let right = law_of_cosines(3.0, 4.0, 5.0).unwrap();
        assert!((right - 90.0).abs() < 1e-9);

        let equilateral = law_of_cosines(2.0, 2.0, 2.0).unwrap();
        assert!((equilateral - 60.0).abs() < 1e-9);

        assert_eq!(law_of_cosines(1.0, 1.0, 3.0), None);
        assert_eq!(law_of_cosines(10.0, 1.0, 1.0), None);
    }

    #[test]
    fn test_reference_example() {
        let params = ArmParams::default();
        let s = solve(&params, 150.0, 50.0).unwrap();

        assert!((s.distance - 158.114).abs() < 1e-3);
        assert!((s.angle_from_horizontal - 18.435).abs() < 1e-3);

        let (a_min, a_max) = params.a_bounds();
        let (b_min, b_max) = params.b_bounds();
        let a = params.a_vertical + s.servo_angle_a;
        let b = params.b_vertical + s.servo_angle_b;
        assert!(a >= a_min && a <= a_max);
        assert!(b >= b_min && b <= b_max);
    }

    #[test]
    fn test_forward_reproduces_target() {
        let params = ArmParams::default();

        for (x, y) in REACHABLE.iter().copied() {
            let s = solve(&params, x, y).unwrap();
            let (fx, fy) = s.forward(&params);

            assert!((fx - x).abs() < 1e-3, "x: {} vs {}", fx, x);
            assert!((fy - y).abs() < 1e-3, "y: {} vs {}", fy, y);
        }
    }

    #[test]
    fn test_move_to_reproduces_target() {
        let params = ArmParams::default();
        let arm = Arm::new(
            &params,
            &ServoCalibration::default(),
            Arc::new(Mutex::new(SimDriver::new())),
            Arc::new(ManualTimer::new()),
        )
        .unwrap();

        for (x, y) in REACHABLE.iter().copied() {
            let s = arm.move_to(x, y).unwrap();

            // Work back from what the servos were actually commanded
            let a = arm.servo(Joint::A).current_angle().unwrap() - params.a_vertical;
            let b = arm.servo(Joint::B).current_angle().unwrap() - params.b_vertical;
            let (fx, fy) = forward(&params, a, b, s.angle_from_horizontal);

            assert!((fx - x).abs() < 1e-3, "x: {} vs {}", fx, x);
            assert!((fy - y).abs() < 1e-3, "y: {} vs {}", fy, y);
        }
    }

    #[test]
    fn test_tiny_target_is_not_origin() {
        let params = ArmParams::default();

        match solve(&params, 1e-170, 0.0) {
            Err(ArmError::Unreachable { kind: UnreachableKind::OutOfRange { distance, .. }, .. }) => {
                assert_eq!(distance, 1e-170)
            }
            other => panic!("gave {:?}", other),
        }
    }

    #[test]
    fn test_origin() {
        for (inner, outer) in [(134.5, 148.0), (100.0, 100.0), (10.0, 300.0)].iter().copied() {
            let params = ArmParams {
                inner_length: inner,
                outer_length: outer,
                ..Default::default()
            };

            assert_eq!(
                solve(&params, 0.0, 0.0),
                Err(ArmError::Unreachable { x: 0.0, y: 0.0, kind: UnreachableKind::Origin })
            );
        }
    }

    #[test]
    fn test_out_of_range() {
        let params = ArmParams::default();

        for (x, y) in [(300.0, 0.0), (0.0, 282.6), (-200.0, 200.0), (5.0, 5.0), (0.0, -1.0)]
            .iter()
            .copied()
        {
            match solve(&params, x, y) {
                Err(ArmError::Unreachable { kind: UnreachableKind::OutOfRange { .. }, .. }) => (),
                other => panic!("({}, {}) gave {:?}", x, y, other),
            }
        }

        assert!(matches!(
            solve(&params, f64::NAN, 1.0),
            Err(ArmError::Unreachable { kind: UnreachableKind::NonFinite, .. })
        ));
    }
}
