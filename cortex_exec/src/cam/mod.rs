//! # Camera alignment
//!
//! The tracker reports the horizontal position of the pattern on the vehicle ahead, negative when
//! it has lost the pattern. The first positive position becomes the centre, later positions are
//! turned into an alignment error against it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod slot;
mod tracker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};

pub use slot::{slot, SlotReceiver, SlotSender};
pub use tracker::{BusTracker, Tracker, TrackerThread};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Outcome of a tracker sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// No centre yet and the pattern is not visible
    Waiting,

    /// The centre was established at this position
    Centred(i32),

    /// Alignment error, centre minus position
    Offset(i32),

    /// The pattern was lost and the centre cleared
    Lost,
}

/// Centre tracking state.
#[derive(Debug, Default)]
pub struct CamAlignment {
    center: Option<i32>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Alignment {
    /// Error to hand to the adjuster, if any.
    pub fn error(&self) -> Option<i32> {
        match self {
            Alignment::Waiting => None,
            Alignment::Centred(_) | Alignment::Lost => Some(0),
            Alignment::Offset(e) => Some(*e),
        }
    }
}

impl CamAlignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn center(&self) -> Option<i32> {
        self.center
    }

    /// Process a position reported by the tracker.
    pub fn update(&mut self, position: i32) -> Alignment {
        match self.center {
            None if position > 0 => {
                info!("CAM initialized to {}", position);
                self.center = Some(position);
                Alignment::Centred(position)
            }
            None => Alignment::Waiting,
            Some(_) if position < 0 => {
                warn!("CAM pattern lost, err: {}", position);
                self.center = None;
                Alignment::Lost
            }
            Some(center) => {
                let error = center - position;
                debug!("CAM {} -> error {}", position, error);
                Alignment::Offset(error)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::adjust::{Actuator, AdjustParams, Adjuster, Position, Role, Side};

    #[derive(Default)]
    struct Recorder {
        drives: Vec<i32>,
    }

    impl Actuator for Recorder {
        fn drive(&mut self, speed: i32) {
            self.drives.push(speed);
        }

        fn steering(&mut self, _degree: i32) {}
    }

    #[test]
    fn test_center_then_lost() {
        let mut cam = CamAlignment::new();

        assert_eq!(cam.update(-1), Alignment::Waiting);
        assert_eq!(cam.update(120), Alignment::Centred(120));
        assert_eq!(cam.center(), Some(120));

        assert_eq!(cam.update(126), Alignment::Offset(-6));
        assert_eq!(cam.update(115), Alignment::Offset(5));

        assert_eq!(cam.update(-5), Alignment::Lost);
        assert_eq!(cam.center(), None);
        assert_eq!(Alignment::Lost.error(), Some(0));

        // A new centre is taken once the pattern is found again
        assert_eq!(cam.update(0), Alignment::Waiting);
        assert_eq!(cam.update(98), Alignment::Centred(98));
    }

    #[test]
    fn test_lost_pattern_reaches_adjuster() {
        let mut cam = CamAlignment::new();
        let mut adj = Adjuster::new(
            AdjustParams {
                car_length_mm: 264.0,
                car_width_mm: 195.0,
                steer_limit_deg: 27,
                gap_gain_deg: 0.0,
                gap_side: Side::Right,
                cam_dead_band: 3,
                cam_speed_step: 2,
            },
            Position {
                own_index: 0,
                line_length: 1,
            },
            Role::Follower,
            (-128, 128),
            0,
        );
        let mut rec = Recorder::default();

        adj.speed_update(20, &mut rec);

        for position in [120, 126, -5, -5].iter() {
            if let Some(error) = cam.update(*position).error() {
                adj.cam_update(error, &mut rec);
            }
        }

        // Losing the pattern drops the bias and leaves the speed at its target
        assert_eq!(rec.drives, vec![20, 22, 20]);
        assert_eq!(adj.speed(), 20);
        assert_eq!(cam.center(), None);
    }
}
