//! Implementation of the Adjuster state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};

// Internal
use super::{line_offset, Actuator, AdjustParams, Geometry, Position, Role, Side};
use util::{maths::clamp, value::Value};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Adjuster state.
///
/// Every update entry point recomputes the outputs it affects and hands them to the actuator
/// only if they differ from what was last sent:
///
/// - `steer_update` recomputes steering then speed,
/// - `gap_update` recomputes steering then speed,
/// - `cam_update` and `speed_update` recompute speed.
pub struct Adjuster {
    params: AdjustParams,
    geometry: Geometry,
    position: Position,
    role: Role,

    /// Allowed range of speed offsets
    speed_limit: (i32, i32),

    /// Target is the requested speed, current is the last speed sent
    speed: Value<i32>,

    /// Target is the requested angle, current is the last angle sent
    steer: Value<i32>,

    /// Current is the filtered measurement, target is the reference gap the convoy started with
    gap: Value<i32>,

    /// Current camera alignment error
    cam: Value<i32>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Adjuster {
    /// Create a new adjuster with everything at rest.
    ///
    /// A positive `initial_gap_mm` is used as both the starting gap and the reference gap,
    /// otherwise the first gap measurement becomes the reference.
    pub fn new(
        params: AdjustParams,
        position: Position,
        role: Role,
        speed_limit: (i32, i32),
        initial_gap_mm: i32,
    ) -> Self {
        let geometry = Geometry {
            length_mm: params.car_length_mm,
            width_mm: params.car_width_mm,
        };

        Self {
            params,
            geometry,
            position,
            role,
            speed_limit,
            speed: Value::new(0),
            steer: Value::new(0),
            gap: Value::new(initial_gap_mm.max(0)),
            cam: Value::new(0),
        }
    }

    /// Last speed sent to the actuator.
    pub fn speed(&self) -> i32 {
        self.speed.get()
    }

    /// Last steering angle sent to the actuator.
    pub fn steer(&self) -> i32 {
        self.steer.get()
    }

    /// Current filtered gap.
    pub fn gap(&self) -> i32 {
        self.gap.get()
    }

    /// Gap the convoy is held at, zero until known.
    pub fn gap_reference(&self) -> i32 {
        self.gap.target()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// New speed target.
    pub fn speed_update(&mut self, target: i32, act: &mut impl Actuator) {
        self.speed.set_target(target);
        self.apply_speed(act);
    }

    /// New steering target, in degrees.
    pub fn steer_update(&mut self, target: i32, act: &mut impl Actuator) {
        self.steer.set_target(target);
        self.apply_steer(act);
        self.apply_speed(act);
    }

    /// New filtered gap measurement.
    ///
    /// Measurements which are not positive or equal the current gap are ignored.
    pub fn gap_update(&mut self, measured_mm: i32, act: &mut impl Actuator) {
        if measured_mm <= 0 {
            debug!("Ignoring degenerate gap {} mm", measured_mm);
            return;
        }

        if !self.gap.differs(measured_mm) {
            return;
        }

        self.gap.update(measured_mm);

        if self.gap.target() <= 0 {
            debug!("Reference gap set to {} mm", measured_mm);
            self.gap.set_target(measured_mm);
        }

        self.apply_steer(act);
        self.apply_speed(act);
    }

    /// New camera alignment error.
    pub fn cam_update(&mut self, error: i32, act: &mut impl Actuator) {
        self.cam.update(error);
        self.apply_speed(act);
    }

    fn apply_steer(&mut self, act: &mut impl Actuator) {
        let target = self.steer.target();

        let corrected = match self.role {
            Role::Leader => target as f64,
            Role::Follower if target == 0 => 0.0,
            Role::Follower => {
                let theta = target as f64;
                let n = line_offset(&self.position, theta);

                self.geometry.corrected_steer_deg(theta, self.gap.get() as f64, n) + self.gap_bias_deg()
            }
        };

        let limit = self.params.steer_limit_deg;
        let degree = clamp(&(corrected.round() as i32), &-limit, &limit);

        trace!("Steering target {} corrected to {:.2}, limited to {}", target, corrected, degree);

        if self.steer.differs(degree) {
            self.steer.update(degree);
            debug!("steering({})", degree);
            act.steering(degree);
        }
    }

    fn apply_speed(&mut self, act: &mut impl Actuator) {
        let target = self.speed.target();

        let corrected = match self.role {
            _ if target == 0 => 0,
            Role::Leader => target,
            Role::Follower => {
                let theta = self.steer.target() as f64;
                let n = line_offset(&self.position, theta);
                let ratio = self.geometry.speed_ratio(theta, self.gap.get() as f64, n);

                (target as f64 * ratio).round() as i32 + self.cam_bias(target)
            }
        };

        let speed = clamp(&corrected, &self.speed_limit.0, &self.speed_limit.1);

        trace!("Speed target {} corrected to {}, limited to {}", target, corrected, speed);

        if self.speed.differs(speed) {
            self.speed.update(speed);
            debug!("drive({})", speed);
            act.drive(speed);
        }
    }

    /// Steering bias pulling the gap back to the reference.
    ///
    /// A gap wider than the reference steers toward the sensor side.
    fn gap_bias_deg(&self) -> f64 {
        let reference = self.gap.target();
        if self.params.gap_gain_deg == 0.0 || reference <= 0 {
            return 0.0;
        }

        let deviation = (self.gap.get() - reference) as f64 / reference as f64;
        let direction = match self.params.gap_side {
            Side::Left => -1.0,
            Side::Right => 1.0,
        };

        direction * self.params.gap_gain_deg * clamp(&deviation, &-1.0, &1.0)
    }

    /// Speed bias from the camera alignment error, in the direction of travel.
    fn cam_bias(&self, target: i32) -> i32 {
        let error = self.cam.get();
        if error.abs() <= self.params.cam_dead_band {
            return 0;
        }

        let step = if error < 0 {
            self.params.cam_speed_step
        } else {
            -self.params.cam_speed_step
        };

        step * target.signum()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
