//! # Convoy Topics
//!
//! Names of the topics the convoy nodes publish on, and the integer scales the payloads are
//! expressed in. Payloads are ASCII encoded integers.

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix shared by every convoy topic
pub const PREFIX: &str = "sp";

/// Target speed for all vehicles
pub const MOTOR: &str = "sp/motor";

/// Target steering angle for all vehicles
pub const STEER: &str = "sp/steer";

/// Position of the tracked pattern reported by the camera tracker
pub const CAM: &str = "sp/cam";

/// Network scale of the motor topic, `(min, max)`, zero centred
pub const MOTOR_SCALE: (i32, i32) = (-16, 16);

/// Network scale of the steer topic, `(min, max)`, in degrees
pub const STEER_SCALE: (i32, i32) = (-90, 90);

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Topic on which a node publishes one of its own telemetry values, `{prefix}/{node}/{leaf}`.
pub fn telemetry(node: &str, leaf: &str) -> String {
    format!("{}/{}/{}", PREFIX, node, leaf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_telemetry() {
        assert_eq!(telemetry("sp-drv-1", "gap"), "sp/sp-drv-1/gap");
    }
}
