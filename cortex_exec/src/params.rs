//! # Cortex Executable Parameters
//!
//! This module provides the parameters of the convoy control node, loaded from
//! `cortex_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use comms_if::{bus::BusParams, eqpt::driver::SpeedScaleError, topics};

use crate::{
    adjust::{AdjustParams, Position, Role},
    driver::DriverParams,
    steering::SteeringParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct CortexExecParams {
    /// Name of this node, used in its telemetry topics
    pub name: String,

    /// Role of this vehicle in the convoy
    pub role: Role,

    /// Place of this vehicle in the convoy line
    pub position: Position,

    pub driver: DriverParams,

    pub steering: SteeringParams,

    pub adjust: AdjustParams,

    pub gap: GapParams,

    pub cam: CamParams,

    pub bus: BusParams,

    #[serde(default)]
    pub topics: TopicParams,
}

/// Ultrasonic gap polling.
#[derive(Deserialize, Debug, Clone)]
pub struct GapParams {
    /// Microcontroller pin of the ultrasonic sensor
    pub pin: u8,

    /// Units: milliseconds
    pub poll_interval_ms: u64,

    /// Number of samples the median is taken over
    pub window: usize,

    /// Size of one unit of the sensor reading
    ///
    /// Units: millimeters
    pub unit_mm: i32,
}

/// Camera alignment polling.
#[derive(Deserialize, Debug, Clone)]
pub struct CamParams {
    pub enabled: bool,

    /// Topic the external tracker publishes pattern positions on
    #[serde(default = "CamParams::default_topic")]
    pub topic: String,

    /// Units: milliseconds
    pub poll_interval_ms: u64,
}

/// Command topics and the scales their payloads use.
#[derive(Deserialize, Debug, Clone)]
pub struct TopicParams {
    pub motor: String,
    pub steer: String,

    /// Payload range of the motor topic, zero is stop
    pub motor_scale: (i32, i32),

    /// Payload range of the steer topic, zero is straight ahead
    ///
    /// Units: degrees
    pub steer_scale: (i32, i32),
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Invalid speed scale: {0}")]
    InvalidSpeedScale(#[from] SpeedScaleError),

    #[error("The drive limit factor must be in (0, 1], found {0}")]
    LimitFactorOutOfRange(f64),

    #[error("At least one attempt per request is required")]
    ZeroRetries,

    #[error("The request queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("Timer intervals must be at least 1 ms")]
    ZeroInterval,

    #[error("Vehicle length and width must be positive, found {0} x {1} mm")]
    InvalidGeometry(f64, f64),

    #[error("The steering limit must be between 0 and 90 degrees, found {0}")]
    SteerLimitOutOfRange(i32),

    #[error("The camera dead band and speed step cannot be negative")]
    NegativeCamSetting,

    #[error("Position {0:?} is outside the line")]
    InvalidPosition(Position),

    #[error("The servo range {0:?} ns must be increasing and fit in the period of {1} ns")]
    InvalidServoRange((u32, u32), u32),

    #[error("The physical range {0:?} ns must be increasing and inside the servo range {1:?} ns")]
    InvalidPhysicalRange((u32, u32), (u32, u32)),

    #[error("The gap median window must hold 3 to 5 samples, found {0}")]
    GapWindowOutOfRange(usize),

    #[error("The gap sensor unit must be positive, found {0} mm")]
    InvalidGapUnit(i32),

    #[error("The {0} topic scale {1:?} must span zero")]
    InvalidTopicScale(&'static str, (i32, i32)),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CortexExecParams {
    /// Check every parameter group.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        self.position.are_valid()?;
        self.driver.are_valid()?;
        self.steering.are_valid()?;
        self.adjust.are_valid()?;
        self.gap.are_valid()?;
        self.cam.are_valid()?;
        self.topics.are_valid()
    }
}

impl GapParams {
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if !(3..=5).contains(&self.window) {
            return Err(ParamsError::GapWindowOutOfRange(self.window));
        }

        if self.unit_mm <= 0 {
            return Err(ParamsError::InvalidGapUnit(self.unit_mm));
        }

        if self.poll_interval_ms == 0 {
            return Err(ParamsError::ZeroInterval);
        }

        Ok(())
    }
}

impl CamParams {
    fn default_topic() -> String {
        topics::CAM.into()
    }

    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if self.poll_interval_ms == 0 {
            Err(ParamsError::ZeroInterval)
        } else {
            Ok(())
        }
    }
}

impl Default for TopicParams {
    fn default() -> Self {
        Self {
            motor: topics::MOTOR.into(),
            steer: topics::STEER.into(),
            motor_scale: topics::MOTOR_SCALE,
            steer_scale: topics::STEER_SCALE,
        }
    }
}

impl TopicParams {
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        for (name, scale) in [("motor", self.motor_scale), ("steer", self.steer_scale)].iter() {
            if !(scale.0 < 0 && scale.1 > 0) {
                return Err(ParamsError::InvalidTopicScale(*name, *scale));
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
