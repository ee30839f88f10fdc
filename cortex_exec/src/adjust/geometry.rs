//! Ackermann turning geometry for vehicles driving side by side.
//!
//! All vehicles in the line turn about the same centre. The reference vehicle, the one the raw
//! steering target is meant for, turns on the inner radius `L / sin(θ)`. A vehicle `n` places
//! further out turns on a radius `n * (gap + W)` larger, so it must steer less and drive faster
//! to stay in line.
//!
//! Angles are in degrees, positive to the right. A zero angle is the straight ahead case and
//! bypasses the trigonometry entirely.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::clamp;

use super::{Position, Side};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle dimensions.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    /// Units: millimeters
    pub length_mm: f64,

    /// Units: millimeters
    pub width_mm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Geometry {
    /// Radius of the turn made by the reference vehicle at `theta_deg`, signed like the angle.
    ///
    /// `None` for the straight ahead case.
    pub fn inner_radius(&self, theta_deg: f64) -> Option<f64> {
        if theta_deg == 0.0 {
            None
        } else {
            Some(self.length_mm / theta_deg.to_radians().sin())
        }
    }

    /// Radius of the turn made by a vehicle `n` places outside the reference vehicle.
    pub fn outer_radius(&self, theta_deg: f64, gap_mm: f64, n: u32) -> Option<f64> {
        self.inner_radius(theta_deg)
            .map(|r| r + theta_deg.signum() * n as f64 * (gap_mm + self.width_mm))
    }

    /// Steering angle putting this vehicle on its own circle around the common centre.
    pub fn corrected_steer_deg(&self, theta_deg: f64, gap_mm: f64, n: u32) -> f64 {
        match self.outer_radius(theta_deg, gap_mm, n) {
            None => 0.0,
            Some(r) => clamp(&(self.length_mm / r), &-1.0, &1.0).asin().to_degrees(),
        }
    }

    /// Factor applied to the requested speed, above one for vehicles outside the reference.
    pub fn speed_ratio(&self, theta_deg: f64, gap_mm: f64, n: u32) -> f64 {
        match (
            self.inner_radius(theta_deg),
            self.outer_radius(theta_deg, gap_mm, n),
        ) {
            (Some(inner), Some(outer)) => outer / inner,
            _ => 1.0,
        }
    }
}

/// Number of vehicles between this one and the inside of a turn at `theta_deg`.
///
/// Turning left the vehicles to the left are on the inside, turning right those to the right.
pub fn line_offset(position: &Position, theta_deg: f64) -> u32 {
    if theta_deg < 0.0 {
        position.vehicles_toward(Side::Left)
    } else {
        position.vehicles_toward(Side::Right)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const GEOM: Geometry = Geometry {
        length_mm: 264.0,
        width_mm: 195.0,
    };

    #[test]
    fn test_straight_ahead() {
        for gap in [0.0, 150.0, 1000.0].iter() {
            for n in 0..4 {
                assert_eq!(GEOM.speed_ratio(0.0, *gap, n), 1.0);
                assert_eq!(GEOM.corrected_steer_deg(0.0, *gap, n), 0.0);
            }
        }
    }

    #[test]
    fn test_reference_vehicle_unchanged() {
        for theta in [-30.0, -5.0, 12.0, 45.0].iter() {
            assert!((GEOM.corrected_steer_deg(*theta, 300.0, 0) - theta).abs() < 1e-9);
            assert!((GEOM.speed_ratio(*theta, 300.0, 0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_outer_vehicle() {
        // 30 degrees right, one vehicle further out with a 300 mm gap
        let inner = GEOM.inner_radius(30.0).unwrap();
        assert!((inner - 528.0).abs() < 1e-9);

        let outer = GEOM.outer_radius(30.0, 300.0, 1).unwrap();
        assert!((outer - 1023.0).abs() < 1e-9);

        let deg = GEOM.corrected_steer_deg(30.0, 300.0, 1);
        assert!((deg - (264.0f64 / 1023.0).asin().to_degrees()).abs() < 1e-9);
        assert!(deg > 0.0 && deg < 30.0);

        assert!((GEOM.speed_ratio(30.0, 300.0, 1) - 1023.0 / 528.0).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric() {
        let right = GEOM.corrected_steer_deg(20.0, 250.0, 2);
        let left = GEOM.corrected_steer_deg(-20.0, 250.0, 2);
        assert!((right + left).abs() < 1e-9);
        assert!(
            (GEOM.speed_ratio(20.0, 250.0, 2) - GEOM.speed_ratio(-20.0, 250.0, 2)).abs() < 1e-12
        );
    }

    #[test]
    fn test_line_offset() {
        let p = Position {
            own_index: 0,
            line_length: 3,
        };
        assert_eq!(line_offset(&p, -10.0), 0);
        assert_eq!(line_offset(&p, 10.0), 2);
    }
}
