//! Synthetic event generators for testing.
//!
//! Produces spacepoint sets with known doublet structure: straight tracks
//! from the beam line crossing concentric barrel layers, so every pair of
//! adjacent-layer hits on the same track forms a compatible doublet under
//! the default configuration.

use std::f32::consts::PI;

use nalgebra::{Vector2, Vector3};

use crate::grid::{GridAxis, SpacepointGrid};
use crate::spacepoint::Spacepoint;

/// Generate spacepoints from straight tracks through the origin.
///
/// Track `i` has azimuth `2 * pi * i / n_tracks` and a cot(theta) swept
/// over `[-1, 1]`, producing one hit per layer at
/// `(r cos(phi), r sin(phi), r * cot)`. Every hit extrapolates back to
/// z = 0, well inside the default collision region.
///
/// # Arguments
/// * `n_tracks` - Number of tracks
/// * `layers` - Barrel layer radii in mm
pub fn track_spacepoints(n_tracks: usize, layers: &[f32]) -> Vec<Spacepoint> {
    let mut spacepoints = Vec::with_capacity(n_tracks * layers.len());
    for i in 0..n_tracks {
        let phi = 2.0 * PI * (i as f32) / (n_tracks as f32) - PI + 0.05;
        let cot_theta = if n_tracks > 1 {
            -1.0 + 2.0 * (i as f32) / ((n_tracks - 1) as f32)
        } else {
            0.0
        };
        for (layer, &r) in layers.iter().enumerate() {
            spacepoints.push(Spacepoint::new(
                Vector3::new(r * phi.cos(), r * phi.sin(), r * cot_theta),
                Vector2::new(0.1, 0.1),
                (i * layers.len() + layer) as u64,
            ));
        }
    }
    spacepoints
}

/// Bin spacepoints into a standard barrel grid: 8 phi bins, 4 z bins over
/// [-300, 300] mm.
pub fn standard_grid(spacepoints: &[Spacepoint]) -> SpacepointGrid {
    let mut grid = SpacepointGrid::new(
        GridAxis::new(-PI, PI, 8),
        GridAxis::new(-300.0, 300.0, 4),
    );
    for (link, sp) in spacepoints.iter().enumerate() {
        grid.insert(link as u32, sp);
    }
    grid
}
