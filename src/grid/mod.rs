//! Phi-z spacepoint grid.
//!
//! The grid groups spacepoints into coarse azimuthal/longitudinal bins so
//! the doublet stages only ever compare a middle spacepoint against the
//! spacepoints of its own and directly adjacent bins. Grid geometry is
//! decided upstream; this module stores a populated grid and answers
//! neighbor-bin queries.

pub mod axis;
pub mod device;

pub use axis::GridAxis;
pub use device::{DeviceGrid, DeviceGridData, MAX_NEIGHBOR_BINS};

use crate::spacepoint::{InternalSpacepoint, Spacepoint};

/// A populated phi-z grid of spacepoints.
///
/// Bins are addressed as `phi_bin + z_bin * n_phi`. The phi axis wraps,
/// the z axis is bounded: spacepoints outside the z range are not binned.
#[derive(Debug, Clone)]
pub struct SpacepointGrid {
    phi_axis: GridAxis,
    z_axis: GridAxis,
    bins: Vec<Vec<InternalSpacepoint>>,
}

impl SpacepointGrid {
    /// Create an empty grid over the given axes.
    pub fn new(phi_axis: GridAxis, z_axis: GridAxis) -> Self {
        let bins = vec![Vec::new(); phi_axis.n_bins * z_axis.n_bins];
        Self {
            phi_axis,
            z_axis,
            bins,
        }
    }

    /// The azimuthal axis.
    pub fn phi_axis(&self) -> &GridAxis {
        &self.phi_axis
    }

    /// The longitudinal axis.
    pub fn z_axis(&self) -> &GridAxis {
        &self.z_axis
    }

    /// Total number of bins.
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Total number of binned spacepoints.
    pub fn n_spacepoints(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// Linear bin index from per-axis indices.
    pub fn bin_index(&self, phi_bin: usize, z_bin: usize) -> usize {
        phi_bin + z_bin * self.phi_axis.n_bins
    }

    /// Bin a spacepoint, returning its bin index.
    ///
    /// Returns `None` and leaves the grid unchanged when the spacepoint
    /// falls outside the z range.
    pub fn insert(&mut self, link: u32, sp: &Spacepoint) -> Option<usize> {
        let z_bin = self.z_axis.bin_checked(sp.z())?;
        let phi_bin = self.phi_axis.bin_wrapped(sp.phi());
        let bin = self.bin_index(phi_bin, z_bin);
        self.bins[bin].push(InternalSpacepoint::new(link, sp));
        Some(bin)
    }

    /// Spacepoints of one bin.
    pub fn bin(&self, bin: usize) -> &[InternalSpacepoint] {
        &self.bins[bin]
    }

    /// Iterate over bins in linear order.
    pub fn iter_bins(&self) -> impl Iterator<Item = &[InternalSpacepoint]> {
        self.bins.iter().map(Vec::as_slice)
    }

    /// Bins reachable from `bin` within one step along each axis.
    ///
    /// Includes `bin` itself; wraps in phi, truncates in z. At most
    /// [`MAX_NEIGHBOR_BINS`] entries.
    pub fn neighbor_bins(&self, bin: usize) -> Vec<usize> {
        let n_phi = self.phi_axis.n_bins;
        let phi_bin = bin % n_phi;
        let z_bin = bin / n_phi;
        let mut out = Vec::with_capacity(MAX_NEIGHBOR_BINS);
        for z in self.z_axis.neighborhood(z_bin, false) {
            for phi in self.phi_axis.neighborhood(phi_bin, true) {
                out.push(self.bin_index(phi, z));
            }
        }
        out
    }
}
