//! Implementations for the Servo structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Internal
use super::{ServoCalibration, ServoConfig, ServoError};
use crate::pwm::{self, SharedDriver};
use crate::timer::{Callback, Timer};
use util::{maths, time};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One physical joint.
///
/// The servo is open loop: `current_angle` is the last commanded angle, not a measured one.
pub struct Servo {
    config: ServoConfig,

    calib: ServoCalibration,

    state: Mutex<ServoState>,

    driver: SharedDriver,

    timer: Arc<dyn Timer>,
}

/// Snapshot of a servo for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServoStatus {
    pub name: String,
    pub channel: u8,
    pub min_angle: f64,
    pub max_angle: f64,
    pub current_angle: Option<f64>,
    pub rested: bool,
}

#[derive(Default)]
struct ServoState {
    /// `None` until the first successful move.
    current_angle: Option<f64>,

    /// Holding torque has been removed by `rest`.
    rested: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Servo {
    /// Create a new servo. No pulse is sent until the first move.
    pub fn new(
        config: ServoConfig,
        calib: ServoCalibration,
        driver: SharedDriver,
        timer: Arc<dyn Timer>,
    ) -> Result<Self, ServoError> {
        config.validate()?;
        calib.validate(&config.name)?;

        let servo = Self {
            config,
            calib,
            state: Mutex::new(ServoState::default()),
            driver,
            timer,
        };

        // Pulses are linear in the angle so checking both bounds covers the whole range
        let resolution = servo.calib.pulse_resolution as f64;
        let low = servo.pulse_for(servo.config.min_angle);
        let high = servo.pulse_for(servo.config.max_angle);
        if low < 0.0 || high >= resolution {
            return Err(ServoError::InvalidConfig {
                name: servo.config.name.clone(),
                reason: format!(
                    "bounds [{}, {}] map to pulses [{}, {}] outside [0, {})",
                    servo.config.min_angle, servo.config.max_angle, low, high, resolution
                ),
            });
        }

        Ok(servo)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    pub fn min_angle(&self) -> f64 {
        self.config.min_angle
    }

    pub fn max_angle(&self) -> f64 {
        self.config.max_angle
    }

    /// The last commanded angle, `None` before the first move.
    pub fn current_angle(&self) -> Option<f64> {
        self.lock_state().current_angle
    }

    /// Whether holding torque is currently removed.
    pub fn is_rested(&self) -> bool {
        self.lock_state().rested
    }

    /// Whether `angle` lies within the servo's inclusive bounds.
    pub fn is_within_bounds(&self, angle: f64) -> bool {
        angle >= self.config.min_angle && angle <= self.config.max_angle
    }

    /// The pulse that would be sent for `angle`.
    ///
    /// Linear map from `[-degree_scale, degree_scale]` onto `[pulse_min, pulse_max]`, angles
    /// beyond the degree scale extrapolate past the calibrated range.
    pub fn pulse_for(&self, angle: f64) -> f64 {
        maths::lin_map(
            (-self.calib.degree_scale, self.calib.degree_scale),
            (self.calib.pulse_min, self.calib.pulse_max),
            angle,
        )
    }

    /// Move the servo to `angle`.
    ///
    /// Returns the estimated duration of the move in seconds. The write itself does not block,
    /// if `on_complete` is given it is run once on the timer after that duration.
    ///
    /// A rejected angle leaves the servo untouched and is reported as an error.
    pub fn set_angle(&self, angle: f64, on_complete: Option<Callback>) -> Result<f64, ServoError> {
        if !angle.is_finite() {
            let e = ServoError::InvalidAngle {
                name: self.config.name.clone(),
                angle,
            };
            error!("{}", e);
            return Err(e);
        }

        if !self.is_within_bounds(angle) {
            let e = ServoError::OutOfBounds {
                name: self.config.name.clone(),
                angle,
                min: self.config.min_angle,
                max: self.config.max_angle,
            };
            error!("{}", e);
            return Err(e);
        }

        // Held until the write is done so writes to this channel never interleave
        let mut state = self.lock_state();

        let delta = match state.current_angle {
            Some(current) => (current - angle).abs(),
            None => self.calib.first_move_delta_deg,
        };
        let delay_s = self.calib.move_duration_s(delta);

        let pulse = self.pulse_for(angle);

        self.write(0, pulse as u16)?;
        state.current_angle = Some(angle);
        state.rested = false;
        drop(state);

        debug!(
            "[{}] channel={} angle={} pulse={} delta={}",
            self.config.name, self.config.channel, angle, pulse, delta
        );

        if let Some(task) = on_complete {
            self.timer.schedule(time::seconds_to_std(delay_s), task);
        }

        Ok(delay_s)
    }

    /// Remove holding torque.
    ///
    /// The logical angle is kept, the next move is computed from it.
    pub fn rest(&self) -> Result<(), ServoError> {
        let mut state = self.lock_state();

        self.write(0, 0)?;
        state.rested = true;

        debug!("[{}] rested", self.config.name);

        Ok(())
    }

    /// Get a snapshot of the servo.
    pub fn status(&self) -> ServoStatus {
        let state = self.lock_state();

        ServoStatus {
            name: self.config.name.clone(),
            channel: self.config.channel,
            min_angle: self.config.min_angle,
            max_angle: self.config.max_angle,
            current_angle: state.current_angle,
            rested: state.rested,
        }
    }

    fn write(&self, on_tick: u16, off_tick: u16) -> Result<(), ServoError> {
        pwm::lock(&self.driver)
            .set_pulse(self.config.channel, on_tick, off_tick)
            .map_err(|source| {
                let e = ServoError::Hardware {
                    name: self.config.name.clone(),
                    source,
                };
                error!("{}", e);
                e
            })
    }

    fn lock_state(&self) -> MutexGuard<'_, ServoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pwm::{PwmError, SimDriver};
    use crate::timer::ManualTimer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Rig {
        sim: Arc<Mutex<SimDriver>>,
        timer: Arc<ManualTimer>,
        servo: Arc<Servo>,
    }

    fn rig(min: f64, max: f64) -> Rig {
        let sim = Arc::new(Mutex::new(SimDriver::new()));
        let timer = Arc::new(ManualTimer::new());
        let servo = Servo::new(
            ServoConfig::new(3, "claw", min, max),
            ServoCalibration::default(),
            sim.clone(),
            timer.clone(),
        )
        .unwrap();

        Rig { sim, timer, servo: Arc::new(servo) }
    }

    #[test]
    fn test_bounds() {
        let r = rig(-70.0, 15.0);

        assert!(r.servo.is_within_bounds(-70.0));
        assert!(r.servo.is_within_bounds(15.0));
        assert!(r.servo.is_within_bounds(0.0));
        assert!(!r.servo.is_within_bounds(-70.001));
        assert!(!r.servo.is_within_bounds(15.001));
        assert!(!r.servo.is_within_bounds(f64::NAN));

        for i in -700..=150 {
            assert!(r.servo.is_within_bounds(i as f64 / 10.0));
        }
    }

    #[test]
    fn test_pulse_mapping() {
        let r = rig(-85.0, 85.0);

        assert_eq!(r.servo.pulse_for(0.0), 375.0);
        assert_eq!(r.servo.pulse_for(80.0), 600.0);
        assert_eq!(r.servo.pulse_for(-80.0), 150.0);
        assert_eq!(r.servo.pulse_for(40.0), 487.5);

        // Extrapolated beyond the degree scale
        assert!((r.servo.pulse_for(85.0) - 614.0625).abs() < 1e-9);
        assert!((r.servo.pulse_for(-85.0) - 135.9375).abs() < 1e-9);
    }

    #[test]
    fn test_pulses_monotonic_across_bounds() {
        let r = rig(-85.0, 85.0);

        let mut written = Vec::new();
        for a in -85..=85 {
            r.servo.set_angle(a as f64, None).unwrap();
            assert_eq!(r.servo.current_angle(), Some(a as f64));
            written.push(r.sim.lock().unwrap().last_pulse(3).unwrap());
        }

        assert!(written.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(written.first(), Some(&135));
        assert_eq!(written.last(), Some(&614));
    }

    #[test]
    fn test_bounds_beyond_pulse_resolution() {
        let sim = Arc::new(Mutex::new(SimDriver::new()));
        let timer = Arc::new(ManualTimer::new());

        // 375 + 225 * 1400 / 80 lands past the 4096 tick period
        let e = Servo::new(
            ServoConfig::new(0, "rot", -85.0, 1400.0),
            ServoCalibration::default(),
            sim.clone(),
            timer.clone(),
        )
        .err()
        .unwrap();
        assert!(matches!(e, ServoError::InvalidConfig { .. }));

        // Negative pulses are rejected too
        let e = Servo::new(
            ServoConfig::new(0, "rot", -200.0, 85.0),
            ServoCalibration::default(),
            sim.clone(),
            timer.clone(),
        )
        .err()
        .unwrap();
        assert!(matches!(e, ServoError::InvalidConfig { .. }));

        assert!(sim.lock().unwrap().writes().is_empty());
    }

    #[test]
    fn test_set_angle() {
        let r = rig(-85.0, 85.0);

        assert_eq!(r.servo.current_angle(), None);

        // First move uses the default delta
        let delay = r.servo.set_angle(70.0, None).unwrap();
        assert!((delay - 1.7).abs() < 1e-9);
        assert_eq!(r.servo.current_angle(), Some(70.0));
        assert_eq!(r.sim.lock().unwrap().last_pulse(3), Some(571));

        let delay = r.servo.set_angle(-1.0, None).unwrap();
        assert!((delay - 0.71).abs() < 1e-9);
        assert_eq!(r.sim.lock().unwrap().last_pulse(3), Some(372));

        let delay = r.servo.set_angle(0.0, None).unwrap();
        assert!((delay - 0.01).abs() < 1e-9);
        assert_eq!(r.sim.lock().unwrap().last_pulse(3), Some(375));

        // No callbacks were requested
        assert_eq!(r.timer.pending(), 0);
    }

    #[test]
    fn test_same_angle_same_pulse() {
        let r = rig(-85.0, 85.0);

        r.servo.set_angle(10.0, None).unwrap();
        r.servo.set_angle(33.3, None).unwrap();
        let first = r.sim.lock().unwrap().last_pulse(3);

        r.servo.set_angle(10.0, None).unwrap();
        r.servo.set_angle(33.3, None).unwrap();
        let second = r.sim.lock().unwrap().last_pulse(3);

        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_bounds() {
        let r = rig(-5.0, 82.0);

        // Checked from the very first call
        let e = r.servo.set_angle(-10.0, None).unwrap_err();
        assert_eq!(e, ServoError::OutOfBounds {
            name: "claw".into(),
            angle: -10.0,
            min: -5.0,
            max: 82.0,
        });
        assert_eq!(r.servo.current_angle(), None);
        assert!(r.sim.lock().unwrap().writes().is_empty());

        r.servo.set_angle(80.0, None).unwrap();
        assert!(r.servo.set_angle(83.0, None).is_err());
        assert!(r.servo.set_angle(f64::INFINITY, None).is_err());
        assert!(r.servo.set_angle(f64::NAN, None).is_err());
        assert_eq!(r.servo.current_angle(), Some(80.0));
        assert_eq!(r.sim.lock().unwrap().writes().len(), 1);
    }

    #[test]
    fn test_callback_fires_once_after_delay() {
        let r = rig(-85.0, 85.0);
        let count = Arc::new(AtomicUsize::new(0));

        r.servo.set_angle(0.0, None).unwrap();

        let c = count.clone();
        let delay = r.servo
            .set_angle(50.0, Some(Box::new(move || { c.fetch_add(1, Ordering::SeqCst); })))
            .unwrap();

        assert_eq!(r.timer.delays(), vec![Duration::from_secs_f64(delay)]);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Moving again does not cancel the pending callback
        r.servo.set_angle(-50.0, None).unwrap();
        assert_eq!(r.timer.fire_all(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(r.timer.fire_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // A rejected move schedules nothing
        let c = count.clone();
        assert!(r.servo
            .set_angle(100.0, Some(Box::new(move || { c.fetch_add(1, Ordering::SeqCst); })))
            .is_err());
        assert_eq!(r.timer.pending(), 0);
    }

    #[test]
    fn test_move_then_rest() {
        let r = rig(-85.0, 85.0);

        let servo = r.servo.clone();
        r.servo
            .set_angle(80.0, Some(Box::new(move || servo.rest().unwrap())))
            .unwrap();
        assert!(!r.servo.is_rested());

        r.timer.fire_all();
        assert!(r.servo.is_rested());
        assert_eq!(r.sim.lock().unwrap().last_pulse(3), Some(0));

        // Rest keeps the logical angle
        assert_eq!(r.servo.current_angle(), Some(80.0));
        let delay = r.servo.set_angle(70.0, None).unwrap();
        assert!((delay - 0.1).abs() < 1e-9);
        assert!(!r.servo.is_rested());
    }

    #[test]
    fn test_hardware_failure() {
        let r = rig(-85.0, 85.0);
        r.servo.set_angle(10.0, None).unwrap();

        r.sim.lock().unwrap().set_unavailable(true);
        let e = r.servo.set_angle(20.0, None).unwrap_err();
        assert_eq!(e, ServoError::Hardware {
            name: "claw".into(),
            source: PwmError::Unavailable,
        });
        assert_eq!(r.servo.current_angle(), Some(10.0));
        assert!(r.servo.rest().is_err());
        assert!(!r.servo.is_rested());
    }

    #[test]
    fn test_concurrent_writes() {
        let r = rig(-85.0, 85.0);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let servo = r.servo.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        servo.set_angle(((i * 50 + j) % 160) as f64 - 80.0, None).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let last = r.sim.lock().unwrap().last_pulse(3).unwrap();
        let current = r.servo.current_angle().unwrap();
        assert_eq!(last, r.servo.pulse_for(current) as u16);
        assert_eq!(r.sim.lock().unwrap().writes().len(), 200);
    }
}
