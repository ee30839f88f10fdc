//! # Adjustment control loop
//!
//! Turns raw speed and steering targets into the commands this vehicle actually needs to hold
//! its place in the convoy line, correcting for its offset in the turn, the measured gap to its
//! neighbour and the camera alignment error.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod geometry;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
pub use geometry::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Receiver of the corrected commands.
pub trait Actuator {
    /// Command a motor speed, as a signed offset from stop.
    fn drive(&mut self, speed: i32);

    /// Command a steering angle in degrees, positive to the right.
    fn steering(&mut self, degree: i32);
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Role of this vehicle in the convoy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Targets are applied as they are
    Leader,

    /// Targets are corrected for the vehicle's place in the line
    Follower,
}

/// Side of the convoy line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leader" => Ok(Role::Leader),
            "follower" => Ok(Role::Follower),
            _ => Err(format!("Unknown role \"{}\", expected leader or follower", s)),
        }
    }
}
