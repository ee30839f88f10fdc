//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the convoy software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Topic based publish/subscribe message bus
pub mod bus;

/// Command and response definitions for equipment (like the drive microcontroller)
pub mod eqpt;

/// Network module
pub mod net;

/// Topic names and network value scales shared by all convoy nodes
pub mod topics;
