//! # Driver parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use comms_if::eqpt::driver::SpeedScale;
use crate::params::ParamsError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct DriverParams {
    /// Path to the serial device of the microcontroller
    pub device: String,

    /// Serial baud rate
    pub baud_rate: u32,

    /// Time to wait for a response before resending a request
    ///
    /// Units: milliseconds
    pub timeout_ms: u64,

    /// Number of attempts made for a request before it fails
    pub max_retries: u8,

    /// Maximum number of outstanding requests, new requests beyond this are dropped unless they
    /// stop the motor
    pub queue_capacity: usize,

    /// Interval at which a non-zero motor command is resent to feed the firmware watchdog
    ///
    /// Units: milliseconds
    pub feed_interval_ms: u64,

    /// Speed byte scale of the firmware
    pub speed_scale: SpeedScale,

    /// Fraction of the speed range in each direction which may actually be commanded
    pub limit_factor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriverParams {
    /// Allowed range of speed offsets from stop, the limit factor applied to each side.
    pub fn speed_limit(&self) -> (i32, i32) {
        (
            (self.speed_scale.min_offset() as f64 * self.limit_factor).round() as i32,
            (self.speed_scale.max_offset() as f64 * self.limit_factor).round() as i32,
        )
    }

    /// Check the parameters are consistent.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        self.speed_scale.are_valid()?;

        if !(self.limit_factor > 0.0 && self.limit_factor <= 1.0) {
            return Err(ParamsError::LimitFactorOutOfRange(self.limit_factor));
        }

        if self.max_retries == 0 {
            return Err(ParamsError::ZeroRetries);
        }

        if self.queue_capacity == 0 {
            return Err(ParamsError::ZeroQueueCapacity);
        }

        if self.timeout_ms == 0 || self.feed_interval_ms == 0 {
            return Err(ParamsError::ZeroInterval);
        }

        Ok(())
    }
}
