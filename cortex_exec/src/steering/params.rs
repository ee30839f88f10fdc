//! # Steering parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::params::ParamsError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct SteeringParams {
    /// Sysfs directory of the PWM chip driving the servo, e.g. `/sys/class/pwm/pwmchip0`
    pub pwm_chip: String,

    /// Channel of the chip the servo is connected to
    pub pwm_channel: u32,

    /// PWM period
    ///
    /// Units: nanoseconds
    pub period_ns: u32,

    /// Duty cycles the servo maps onto -90 and +90 degrees
    ///
    /// Units: nanoseconds
    pub servo_range_ns: (u32, u32),

    /// Duty cycles the steering linkage can physically reach, commands are clamped to this
    ///
    /// Units: nanoseconds
    pub physical_range_ns: (u32, u32),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteeringParams {
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        let (servo_min, servo_max) = self.servo_range_ns;
        let (phy_min, phy_max) = self.physical_range_ns;

        if !(servo_min < servo_max && servo_max <= self.period_ns) {
            return Err(ParamsError::InvalidServoRange(self.servo_range_ns, self.period_ns));
        }

        if !(servo_min <= phy_min && phy_min < phy_max && phy_max <= servo_max) {
            return Err(ParamsError::InvalidPhysicalRange(
                self.physical_range_ns,
                self.servo_range_ns,
            ));
        }

        Ok(())
    }
}
