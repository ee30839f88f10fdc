//! # Gap filter
//!
//! Median filter over the last few ultrasonic samples. Single spikes from the sensor never reach
//! the adjuster, and neither do zero readings, which the sensor reports when it sees no echo.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use log::{debug, trace};

use util::maths::median;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sliding window median filter.
#[derive(Debug, Clone)]
pub struct GapFilter {
    window: VecDeque<i32>,
    size: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GapFilter {
    /// Create a filter over a window of `size` samples.
    pub fn new(size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(size + 1),
            size,
        }
    }

    /// Add a sample in millimeters.
    ///
    /// Returns the median of the window once it is full, `None` before that or if the sample was
    /// discarded.
    pub fn push(&mut self, sample_mm: i32) -> Option<i32> {
        if sample_mm <= 0 {
            trace!("Discarding gap sample {}", sample_mm);
            return None;
        }

        self.window.push_back(sample_mm);
        while self.window.len() > self.size {
            self.window.pop_front();
        }

        if self.window.len() < self.size {
            return None;
        }

        let samples: Vec<i32> = self.window.iter().copied().collect();
        let gap = median(&samples);
        debug!("Gap samples {:?}, median {:?}", samples, gap);
        gap
    }

    /// Drop every sample collected so far.
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
