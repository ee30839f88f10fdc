//! # Steering servo
//!
//! The steering servo is driven directly from a PWM output of the host. Angles are mapped
//! linearly from -90..90 degrees onto the servo's duty cycle range, then clamped to what the
//! steering linkage can physically reach.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pwm;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};

// Internal
pub use params::SteeringParams;
pub use pwm::{Pwm, PwmError};
use util::maths::{clamp, RangeMap};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Angle range the servo duty cycle range corresponds to.
///
/// Units: degrees
pub const SERVO_ANGLE_RANGE: (i32, i32, i32) = (-90, 0, 90);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering servo on a PWM channel.
pub struct Steering {
    pwm: Pwm,
    map: RangeMap,
    physical_range_ns: (u32, u32),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Steering {
    /// Set up the PWM channel, centre the servo and enable the output.
    pub fn new(params: &SteeringParams) -> Result<Self, PwmError> {
        let (servo_min, servo_max) = params.servo_range_ns;
        let servo_mid = servo_min + (servo_max - servo_min) / 2;

        let mut steering = Self {
            pwm: Pwm::new(&params.pwm_chip, params.pwm_channel, params.period_ns)?,
            map: RangeMap::new(
                SERVO_ANGLE_RANGE,
                (servo_min as i32, servo_mid as i32, servo_max as i32),
            ),
            physical_range_ns: params.physical_range_ns,
        };

        steering.steer(0)?;
        steering.pwm.set_enabled(true)?;

        info!("Steering servo on {} channel {} enabled", params.pwm_chip, params.pwm_channel);

        Ok(steering)
    }

    /// Duty cycle for an angle, and whether the angle had to be limited.
    pub fn duty_cycle_ns(&self, degree: i32) -> (u32, bool) {
        let duty = self.map.forward(degree).max(0) as u32;
        let limited = clamp(&duty, &self.physical_range_ns.0, &self.physical_range_ns.1);

        (limited, limited != duty)
    }

    /// Point the wheels at `degree`, positive to the right.
    ///
    /// Returns false if the angle was beyond the physical range and had to be limited.
    pub fn steer(&mut self, degree: i32) -> Result<bool, PwmError> {
        let (duty, limited) = self.duty_cycle_ns(degree);

        trace!("dc: {:3} -> {:7}{}", degree, duty, if limited { " (limited)" } else { "" });

        self.pwm.set_duty_cycle(duty)?;

        Ok(!limited)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
