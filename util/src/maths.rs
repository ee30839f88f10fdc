//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A zero-centred, dual sided mapping between two integer scales.
///
/// Values below the source centre are mapped linearly onto the lower half of
/// the target, values above it onto the upper half. This allows asymmetric
/// scales (for example a motor which can go faster forwards than backwards)
/// to share the same centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMap {
    /// Source `(min, centre, max)`
    pub source: (f64, f64, f64),

    /// Target `(min, centre, max)`
    pub target: (f64, f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RangeMap {
    /// Create a new map from `(min, centre, max)` triples.
    pub fn new(source: (i32, i32, i32), target: (i32, i32, i32)) -> Self {
        Self {
            source: (source.0 as f64, source.1 as f64, source.2 as f64),
            target: (target.0 as f64, target.1 as f64, target.2 as f64),
        }
    }

    /// Map a source value onto the target scale, rounding to the nearest
    /// integer. Values outside the source range are clamped first.
    pub fn forward(&self, value: i32) -> i32 {
        let v = clamp(&(value as f64), &self.source.0, &self.source.2);
        map_dual(self.source, self.target, v).round() as i32
    }

    /// Map a target value back onto the source scale.
    pub fn inverse(&self, value: i32) -> i32 {
        let v = clamp(&(value as f64), &self.target.0, &self.target.2);
        map_dual(self.target, self.source, v).round() as i32
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Map a value from two ranges joined at a centre into two other ranges.
///
/// Ranges are given as `(min, centre, max)`. Degenerate halves (where min
/// equals the centre, or the centre equals max) map onto the target centre.
pub fn map_dual<T>(source_range: (T, T, T), target_range: (T, T, T), value: T) -> T
where
    T: Float,
{
    let (s_min, s_ctr, s_max) = source_range;
    let (t_min, t_ctr, t_max) = target_range;

    if value < s_ctr {
        if s_min == s_ctr {
            return t_ctr;
        }
        lin_map((s_min, s_ctr), (t_min, t_ctr), value)
    } else {
        if s_ctr == s_max {
            return t_ctr;
        }
        lin_map((s_ctr, s_max), (t_ctr, t_max), value)
    }
}

/// Clamp a value between a minimum and maximum.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: PartialOrd + Copy,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Return the median of the given values, or `None` if there are none.
///
/// For an even number of values the upper of the two middle values is
/// returned.
pub fn median<T>(values: &[T]) -> Option<T>
where
    T: Ord + Copy,
{
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    Some(sorted[sorted.len() / 2])
}
