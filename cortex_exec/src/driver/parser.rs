//! Receive side framing of the microcontroller protocol.
//!
//! The parser is a two state machine. In `Sync` it scans for the sync byte and discards
//! everything before it. In `Data` it waits for the rest of a frame and checks the end marker.
//! A bad end marker sends the parser back to `Sync` starting at the byte after the sync byte, so
//! a corrupted or shifted stream costs at most the frame it hit and resynchronises on the next
//! sync byte.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::driver::{Frame, BYTE_END, BYTE_SYNC, PKT_SIZE};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Sync,
    Data,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Incremental frame parser.
///
/// Bytes may arrive in any fragmentation, partial frames are buffered until the next call.
#[derive(Debug)]
pub struct Parser {
    state: ParseState,
    buf: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Sync,
            buf: Vec::with_capacity(2 * PKT_SIZE),
        }
    }

    /// Feed received bytes, returning every complete frame found in them in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut pos = 0;

        loop {
            match self.state {
                ParseState::Sync => match self.buf[pos..].iter().position(|&b| b == BYTE_SYNC) {
                    Some(i) => {
                        pos += i + 1;
                        self.state = ParseState::Data;
                    }
                    None => {
                        pos = self.buf.len();
                        break;
                    }
                },
                ParseState::Data => {
                    // Type, value and end marker follow the sync byte
                    if self.buf.len() - pos < PKT_SIZE - 1 {
                        break;
                    }

                    if self.buf[pos + PKT_SIZE - 2] == BYTE_END {
                        frames.push(Frame {
                            raw_type: self.buf[pos],
                            value: self.buf[pos + 1],
                        });
                        pos += PKT_SIZE - 1;
                    }

                    self.state = ParseState::Sync;
                }
            }
        }

        self.buf.drain(..pos);

        frames
    }

    /// Number of bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn frame(raw_type: u8, value: u8) -> Frame {
        Frame { raw_type, value }
    }

    #[test]
    fn test_single_frame() {
        let mut p = Parser::new();
        assert_eq!(p.push(&[b'[', 0x02, 0x60, b']']), vec![frame(0x02, 0x60)]);
        assert_eq!(p.buffered(), 0);
    }

    #[test]
    fn test_frame_in_noise() {
        let mut p = Parser::new();

        let mut stream = vec![0x00, 0xff, 0x13, 0x5d, 0x42, 0x07];
        stream.extend_from_slice(&[b'[', 0x03, 0x1e, b']']);
        stream.extend_from_slice(&[0x99, 0x5d, 0x00, 0x01]);

        assert_eq!(p.push(&stream), vec![frame(0x03, 0x1e)]);
        assert_eq!(p.buffered(), 0);
    }

    /// `n` noise bytes, never a sync byte.
    fn noise(next: &mut impl FnMut() -> u8, n: usize) -> Vec<u8> {
        (0..n)
            .map(|_| match next() {
                BYTE_SYNC => 0x00,
                b => b,
            })
            .collect()
    }

    #[test]
    fn test_frame_in_generated_noise() {
        // Deterministic bytes from a linear congruential generator
        let mut seed: u32 = 0x2545_f491;
        let mut next = move || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 16) as u8
        };

        for prefix_len in 0..24 {
            for suffix_len in 0..24 {
                let expected = frame(next(), next());

                let mut stream = noise(&mut next, prefix_len);
                stream.extend_from_slice(&expected.encode());
                stream.extend(noise(&mut next, suffix_len));

                let mut p = Parser::new();
                assert_eq!(
                    p.push(&stream),
                    vec![expected],
                    "prefix {}, suffix {}: {:02X?}",
                    prefix_len,
                    suffix_len,
                    stream
                );
                assert_eq!(p.buffered(), 0);
            }
        }
    }

    #[test]
    fn test_stray_sync_resynchronises() {
        let mut p = Parser::new();

        // A stray sync byte followed by a real frame, the first candidate fails its end check
        let stream = [b'[', 0x01, b'[', 0x02, 0x60, b']'];

        assert_eq!(p.push(&stream), vec![frame(0x02, 0x60)]);
    }

    #[test]
    fn test_sync_byte_as_payload() {
        let mut p = Parser::new();

        let stream = [b'[', 0x04, b'[', b']', b'[', 0x01, 0x07, b']'];

        assert_eq!(p.push(&stream), vec![frame(0x04, b'['), frame(0x01, 0x07)]);
    }

    #[test]
    fn test_fragmented() {
        let mut p = Parser::new();
        let stream = [0x55, b'[', 0x83, 0x00, b']', b'[', 0x01, 0x05, b']'];

        let mut frames = Vec::new();
        for b in stream.iter() {
            frames.extend(p.push(&[*b]));
        }

        assert_eq!(frames, vec![frame(0x83, 0x00), frame(0x01, 0x05)]);
    }

    #[test]
    fn test_partial_frame_is_kept() {
        let mut p = Parser::new();
        assert!(p.push(&[b'[', 0x02]).is_empty());
        assert_eq!(p.buffered(), 1);
        assert_eq!(p.push(&[0x30, b']']), vec![frame(0x02, 0x30)]);
    }

    #[test]
    fn test_noise_only_is_discarded() {
        let mut p = Parser::new();
        assert!(p.push(&[0x01, 0x02, 0x03, b']', 0x00]).is_empty());
        assert_eq!(p.buffered(), 0);
    }
}
