//! # Adjuster parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::Side;
use crate::params::ParamsError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct AdjustParams {
    /// Wheelbase of the vehicle
    ///
    /// Units: millimeters
    pub car_length_mm: f64,

    /// Width of the vehicle
    ///
    /// Units: millimeters
    pub car_width_mm: f64,

    /// Largest steering angle which may be commanded, in either direction
    ///
    /// Units: degrees
    pub steer_limit_deg: i32,

    /// Steering bias applied for a gap twice the reference gap, zero disables the gap bias
    ///
    /// Units: degrees
    pub gap_gain_deg: f64,

    /// Side of the vehicle the gap sensor looks at
    pub gap_side: Side,

    /// Camera errors up to this size are ignored
    pub cam_dead_band: i32,

    /// Speed bias applied when the camera error is outside the dead band
    pub cam_speed_step: i32,
}

/// Place of this vehicle in the convoy line.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Index of this vehicle counted from the left of the line
    pub own_index: u32,

    /// Number of vehicles in the line
    pub line_length: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AdjustParams {
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if !(self.car_length_mm > 0.0 && self.car_width_mm > 0.0) {
            return Err(ParamsError::InvalidGeometry(self.car_length_mm, self.car_width_mm));
        }

        if !(0..=90).contains(&self.steer_limit_deg) {
            return Err(ParamsError::SteerLimitOutOfRange(self.steer_limit_deg));
        }

        if self.cam_dead_band < 0 || self.cam_speed_step < 0 {
            return Err(ParamsError::NegativeCamSetting);
        }

        Ok(())
    }
}

impl Position {
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if self.own_index < self.line_length {
            Ok(())
        } else {
            Err(ParamsError::InvalidPosition(*self))
        }
    }

    /// Number of vehicles between this one and the given side of the line.
    pub fn vehicles_toward(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.own_index,
            Side::Right => self.line_length.saturating_sub(self.own_index + 1),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vehicles_toward() {
        let p = Position {
            own_index: 1,
            line_length: 4,
        };
        assert_eq!(p.vehicles_toward(Side::Left), 1);
        assert_eq!(p.vehicles_toward(Side::Right), 2);
        assert!(p.are_valid().is_ok());

        let p = Position {
            own_index: 4,
            line_length: 4,
        };
        assert!(p.are_valid().is_err());
    }
}
