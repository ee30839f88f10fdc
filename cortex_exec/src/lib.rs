//! # Cortex library.
//!
//! Onboard control of a convoy vehicle: the microcontroller driver, the adjustment control loop
//! and the sensors and actuators around them. The `cortex_exec` binary wires these into the
//! node's event loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Adjustment control loop - corrects speed and steering targets for the vehicle's place in the
/// convoy
pub mod adjust;

/// Camera alignment - turns tracker positions into an alignment error
pub mod cam;

/// Drive microcontroller driver - motor control and sensor queries over the serial link
pub mod driver;

/// Gap filter - median filtering of ultrasonic gap samples
pub mod gap;

/// Executable parameters
pub mod params;

/// Steering servo - drives the steering servo through sysfs PWM
pub mod steering;
