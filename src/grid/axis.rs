//! Uniform grid axes.

use serde::{Deserialize, Serialize};

/// A uniformly binned axis over a closed coordinate range.
///
/// Used twice by the spacepoint grid: an azimuthal axis that wraps around
/// and a longitudinal axis that clamps at its edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridAxis {
    /// Lower edge of the binned range.
    pub min: f32,
    /// Upper edge of the binned range.
    pub max: f32,
    /// Number of bins.
    pub n_bins: usize,
}

impl GridAxis {
    /// Create an axis.
    ///
    /// # Panics
    ///
    /// Panics if `max <= min` or `n_bins == 0`; an unbinnable axis is a
    /// caller bug.
    pub fn new(min: f32, max: f32, n_bins: usize) -> Self {
        assert!(max > min, "axis range [{min}, {max}] is empty");
        assert!(n_bins > 0, "axis needs at least one bin");
        Self { min, max, n_bins }
    }

    /// Width of one bin.
    pub fn bin_width(&self) -> f32 {
        (self.max - self.min) / self.n_bins as f32
    }

    /// Bin index for a coordinate, clamped into range.
    pub fn bin_clamped(&self, value: f32) -> usize {
        let raw = ((value - self.min) / self.bin_width()).floor();
        if raw < 0.0 {
            0
        } else {
            (raw as usize).min(self.n_bins - 1)
        }
    }

    /// Bin index for a coordinate, or `None` if outside the range.
    pub fn bin_checked(&self, value: f32) -> Option<usize> {
        if value < self.min || value > self.max {
            return None;
        }
        Some(self.bin_clamped(value))
    }

    /// Bin index for a circular coordinate, wrapping into range.
    pub fn bin_wrapped(&self, value: f32) -> usize {
        let span = self.max - self.min;
        let mut v = (value - self.min) % span;
        if v < 0.0 {
            v += span;
        }
        ((v / self.bin_width()) as usize).min(self.n_bins - 1)
    }

    /// Bins adjacent to `bin` (inclusive), one step along this axis.
    ///
    /// `wrap` selects circular neighbors; otherwise out-of-range neighbors
    /// are truncated. Duplicates from wrapping on very small axes are
    /// removed, so the result holds at most three unique bins.
    pub fn neighborhood(&self, bin: usize, wrap: bool) -> Vec<usize> {
        let n = self.n_bins as isize;
        let b = bin as isize;
        let mut out = Vec::with_capacity(3);
        for step in -1..=1isize {
            let raw = b + step;
            let idx = if wrap {
                raw.rem_euclid(n) as usize
            } else if raw < 0 || raw >= n {
                continue;
            } else {
                raw as usize
            };
            if !out.contains(&idx) {
                out.push(idx);
            }
        }
        out
    }
}
