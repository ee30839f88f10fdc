//! # Drive Microcontroller Protocol
//!
//! Every exchange with the microcontroller is a fixed four byte frame:
//!
//! ```text
//! [SYNC][TYPE][VALUE][END]
//! ```
//!
//! with `SYNC = '['` and `END = ']'`. Responses echo the request type and set the top bit of the
//! type byte if the request was refused.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Start of frame marker
pub const BYTE_SYNC: u8 = b'[';

/// End of frame marker
pub const BYTE_END: u8 = b']';

/// Size of a frame on the wire, including both markers
pub const PKT_SIZE: usize = 4;

/// Set in the type byte of a response if the microcontroller refused the request
pub const ERR_BIT: u8 = 1 << 7;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Packet types understood by the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    Ping = 0x0,
    Version = 0x1,
    Motor = 0x2,
    UltraSonic = 0x3,
    Analog = 0x4,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A frame as seen on the wire, with the type byte still raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Raw type byte, possibly carrying the [`ERR_BIT`]
    pub raw_type: u8,

    /// Payload
    pub value: u8,
}

/// Speed byte scale of the microcontroller.
///
/// The endpoints differ between hardware revisions so they are always taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedScale {
    /// Full speed backwards
    pub back_full: u8,

    /// Stopped
    pub stop: u8,

    /// Full speed forwards
    pub forward_full: u8,
}

/// Errors in a [`SpeedScale`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SpeedScaleError {
    #[error("Speed scale must satisfy back_full < stop < forward_full, found {0:?}")]
    NotOrdered(SpeedScale),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PacketType {
    /// Convert a type byte (with the error bit already removed) into a packet type.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(PacketType::Ping),
            0x1 => Some(PacketType::Version),
            0x2 => Some(PacketType::Motor),
            0x3 => Some(PacketType::UltraSonic),
            0x4 => Some(PacketType::Analog),
            _ => None,
        }
    }
}

impl Frame {
    /// Build a request frame.
    pub fn request(packet_type: PacketType, value: u8) -> Self {
        Self {
            raw_type: packet_type as u8,
            value,
        }
    }

    /// True if the error bit is set in the type byte.
    pub fn is_error(&self) -> bool {
        self.raw_type & ERR_BIT != 0
    }

    /// Type byte without the error bit.
    pub fn type_byte(&self) -> u8 {
        self.raw_type & !ERR_BIT
    }

    /// The packet type, or `None` if the type byte is outside the known range.
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_u8(self.type_byte())
    }

    /// Encode into wire bytes.
    pub fn encode(&self) -> [u8; PKT_SIZE] {
        [BYTE_SYNC, self.raw_type, self.value, BYTE_END]
    }
}

impl SpeedScale {
    /// Check the endpoints are ordered around the stop value.
    pub fn are_valid(&self) -> Result<(), SpeedScaleError> {
        if self.back_full < self.stop && self.stop < self.forward_full {
            Ok(())
        } else {
            Err(SpeedScaleError::NotOrdered(*self))
        }
    }

    /// Lowest (most negative) speed offset relative to stop.
    pub fn min_offset(&self) -> i32 {
        self.back_full as i32 - self.stop as i32
    }

    /// Highest speed offset relative to stop.
    pub fn max_offset(&self) -> i32 {
        self.forward_full as i32 - self.stop as i32
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode() {
        let f = Frame::request(PacketType::Motor, 0x60);
        assert_eq!(f.encode(), [b'[', 0x02, 0x60, b']']);
    }

    #[test]
    fn test_error_bit() {
        let f = Frame {
            raw_type: 0x83,
            value: 0,
        };
        assert!(f.is_error());
        assert_eq!(f.type_byte(), 0x03);
        assert_eq!(f.packet_type(), Some(PacketType::UltraSonic));

        let unknown = Frame {
            raw_type: 0x85,
            value: 0,
        };
        assert_eq!(unknown.packet_type(), None);
    }

    #[test]
    fn test_speed_scale() {
        let s = SpeedScale {
            back_full: 0x10,
            stop: 0x30,
            forward_full: 0x90,
        };
        assert!(s.are_valid().is_ok());
        assert_eq!(s.min_offset(), -0x20);
        assert_eq!(s.max_offset(), 0x60);

        let bad = SpeedScale {
            back_full: 0x40,
            stop: 0x30,
            forward_full: 0x90,
        };
        assert_eq!(bad.are_valid(), Err(SpeedScaleError::NotOrdered(bad)));
    }
}
