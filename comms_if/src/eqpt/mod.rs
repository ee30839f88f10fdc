//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the vehicle's equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

/// Serial protocol spoken by the drive microcontroller
pub mod driver;
