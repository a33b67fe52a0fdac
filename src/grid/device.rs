//! Flattened grid form consumed by kernels.
//!
//! Kernels cannot chase per-bin vectors, so the grid is lowered to flat
//! arrays before upload: spacepoints concatenated in bin order behind a
//! CSR offset table, plus a fixed-width neighbor-bin table padded with -1.
//! The position of a spacepoint in this flattened order is its *flat index*;
//! counters and output rows are addressed by it.

use cubecl::prelude::*;
use cubecl::server::Handle;

use crate::runtime::CudaClient;

use super::SpacepointGrid;

/// Maximum neighbor bins per bin: a 3x3 phi-z neighborhood.
pub const MAX_NEIGHBOR_BINS: usize = 9;

/// Per-spacepoint parameter stride in `sp_params`: x, y, z, radius.
pub const SP_PARAM_STRIDE: usize = 4;

/// Host-side flattened grid arrays.
#[derive(Debug, Clone)]
pub struct DeviceGridData {
    /// Spacepoint parameters, `[N * 4]`: x, y, z, radius per spacepoint,
    /// concatenated in bin order.
    pub sp_params: Vec<f32>,
    /// Bin of each spacepoint, `[N]`.
    pub sp_bin: Vec<u32>,
    /// Event-collection link of each spacepoint, `[N]`.
    pub sp_link: Vec<u32>,
    /// Row starts of each bin into the spacepoint arrays, `[B + 1]`.
    pub bin_offsets: Vec<u32>,
    /// Neighbor bins, `[B * MAX_NEIGHBOR_BINS]`, -1 padded.
    pub neighbor_bins: Vec<i32>,
    /// Number of spacepoints.
    pub n_spacepoints: usize,
    /// Number of bins.
    pub n_bins: usize,
}

impl DeviceGridData {
    /// Lower a populated grid into flat arrays.
    pub fn flatten(grid: &SpacepointGrid) -> Self {
        let n_bins = grid.n_bins();
        let n_spacepoints = grid.n_spacepoints();

        let mut sp_params = Vec::with_capacity(n_spacepoints * SP_PARAM_STRIDE);
        let mut sp_bin = Vec::with_capacity(n_spacepoints);
        let mut sp_link = Vec::with_capacity(n_spacepoints);
        let mut bin_offsets = Vec::with_capacity(n_bins + 1);
        let mut neighbor_bins = vec![-1i32; n_bins * MAX_NEIGHBOR_BINS];

        bin_offsets.push(0u32);
        for (bin, spacepoints) in grid.iter_bins().enumerate() {
            for sp in spacepoints {
                sp_params.extend_from_slice(&[sp.x, sp.y, sp.z, sp.radius]);
                sp_bin.push(bin as u32);
                sp_link.push(sp.link);
            }
            bin_offsets.push(sp_params.len() as u32 / SP_PARAM_STRIDE as u32);

            for (slot, neighbor) in grid.neighbor_bins(bin).into_iter().enumerate() {
                neighbor_bins[bin * MAX_NEIGHBOR_BINS + slot] = neighbor as i32;
            }
        }

        Self {
            sp_params,
            sp_bin,
            sp_link,
            bin_offsets,
            neighbor_bins,
            n_spacepoints,
            n_bins,
        }
    }

    /// Flat index of the first spacepoint of a bin.
    pub fn bin_start(&self, bin: usize) -> usize {
        self.bin_offsets[bin] as usize
    }
}

/// Device-resident grid arrays.
pub struct DeviceGrid {
    /// Spacepoint parameters, `[N * 4]` f32.
    pub sp_params: Handle,
    /// Bin of each spacepoint, `[N]` u32.
    pub sp_bin: Handle,
    /// Event link of each spacepoint, `[N]` u32.
    pub sp_link: Handle,
    /// Bin row starts, `[B + 1]` u32.
    pub bin_offsets: Handle,
    /// Neighbor table, `[B * MAX_NEIGHBOR_BINS]` i32.
    pub neighbor_bins: Handle,
    /// Number of spacepoints.
    pub n_spacepoints: usize,
    /// Number of bins.
    pub n_bins: usize,
}

impl DeviceGrid {
    /// Upload flattened grid arrays.
    pub fn upload(client: &CudaClient, data: &DeviceGridData) -> Self {
        Self {
            sp_params: create_padded(client, f32::as_bytes(&data.sp_params)),
            sp_bin: create_padded(client, u32::as_bytes(&data.sp_bin)),
            sp_link: create_padded(client, u32::as_bytes(&data.sp_link)),
            bin_offsets: create_padded(client, u32::as_bytes(&data.bin_offsets)),
            neighbor_bins: create_padded(client, i32::as_bytes(&data.neighbor_bins)),
            n_spacepoints: data.n_spacepoints,
            n_bins: data.n_bins,
        }
    }
}

/// Upload bytes, padding zero-sized allocations to one word.
fn create_padded(client: &CudaClient, bytes: &[u8]) -> Handle {
    if bytes.is_empty() {
        client.create(&[0u8; 4])
    } else {
        client.create(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridAxis;
    use crate::spacepoint::Spacepoint;
    use nalgebra::{Vector2, Vector3};
    use std::f32::consts::PI;

    fn populated_grid() -> SpacepointGrid {
        let mut grid = SpacepointGrid::new(
            GridAxis::new(-PI, PI, 4),
            GridAxis::new(-100.0, 100.0, 2),
        );
        let positions = [
            [30.0, 0.0, -50.0],
            [0.0, 30.0, -50.0],
            [-30.0, 0.0, 50.0],
            [30.0, 1.0, -49.0],
        ];
        for (link, p) in positions.iter().enumerate() {
            grid.insert(
                link as u32,
                &Spacepoint::new(Vector3::new(p[0], p[1], p[2]), Vector2::zeros(), 0),
            );
        }
        grid
    }

    #[test]
    fn test_flatten_offsets_partition_spacepoints() {
        let grid = populated_grid();
        let data = DeviceGridData::flatten(&grid);

        assert_eq!(data.n_spacepoints, 4);
        assert_eq!(data.bin_offsets.len(), grid.n_bins() + 1);
        assert_eq!(*data.bin_offsets.last().unwrap() as usize, 4);
        assert_eq!(data.sp_params.len(), 4 * SP_PARAM_STRIDE);
        assert_eq!(data.sp_bin.len(), 4);
        assert_eq!(data.sp_link.len(), 4);

        // Offsets are non-decreasing and consistent with per-bin counts.
        for bin in 0..grid.n_bins() {
            let count = (data.bin_offsets[bin + 1] - data.bin_offsets[bin]) as usize;
            assert_eq!(count, grid.bin(bin).len());
        }
    }

    #[test]
    fn test_flatten_sp_bin_matches_offsets() {
        let data = DeviceGridData::flatten(&populated_grid());
        for (flat, &bin) in data.sp_bin.iter().enumerate() {
            let start = data.bin_offsets[bin as usize] as usize;
            let end = data.bin_offsets[bin as usize + 1] as usize;
            assert!(start <= flat && flat < end);
        }
    }

    #[test]
    fn test_flatten_neighbor_table_padding() {
        let grid = populated_grid();
        let data = DeviceGridData::flatten(&grid);
        assert_eq!(data.neighbor_bins.len(), grid.n_bins() * MAX_NEIGHBOR_BINS);

        for bin in 0..grid.n_bins() {
            let row = &data.neighbor_bins[bin * MAX_NEIGHBOR_BINS..(bin + 1) * MAX_NEIGHBOR_BINS];
            let real: Vec<i32> = row.iter().copied().filter(|&b| b >= 0).collect();
            assert_eq!(real.len(), grid.neighbor_bins(bin).len());
            assert!(real.contains(&(bin as i32)), "bin is its own neighbor");
            // Padding sits behind the real entries.
            for (a, b) in row.iter().zip(row.iter().skip(1)) {
                assert!(!(*a < 0 && *b >= 0), "pad entries trail real entries");
            }
        }
    }

    #[test]
    fn test_flatten_empty_grid() {
        let grid = SpacepointGrid::new(GridAxis::new(-PI, PI, 4), GridAxis::new(-1.0, 1.0, 2));
        let data = DeviceGridData::flatten(&grid);
        assert_eq!(data.n_spacepoints, 0);
        assert!(data.sp_params.is_empty());
        assert_eq!(data.bin_offsets, vec![0; grid.n_bins() + 1]);
    }
}
