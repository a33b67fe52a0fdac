//! GPU two-pass doublet pipeline.
//!
//! Host orchestration is sequential by construction: the counting kernel's
//! results are downloaded with a blocking read before the finding buffers
//! are sized, so the finding launch is always sequenced after the counts
//! are visible. Device memory is only ever allocated between kernel
//! launches, never inside one.
//!
//! ```text
//! Grid (host)
//!     │ upload
//!     ▼
//! count_doublets_kernel ──► counters [N * 2], candidate container
//!     │ download counters (blocking; sequencing point)
//!     ▼
//! host prefix sums ──► exact mid-bottom / mid-top buffers
//!     ▼
//! find_doublets_kernel ──► filled doublet rows
//!     │ download
//!     ▼
//! DoubletOutput (host)
//! ```

use anyhow::{Context, Result};
use cubecl::cuda::CudaRuntime;
use cubecl::prelude::*;
use tracing::debug;

use crate::config::SeedFinderConfig;
use crate::container::record::unpack_slice;
use crate::container::{Container, ContainerBuffer};
use crate::grid::{DeviceGrid, DeviceGridData, SpacepointGrid};
use crate::runtime::{CudaClient, GpuRuntime};

use super::kernels::{count_doublets_kernel, find_doublets_kernel, COUNTER_WORDS};
use super::{Doublet, DoubletCounter, DoubletOutput};

/// GPU doublet finder.
///
/// Owns the CUDA runtime; one instance can process any number of events.
pub struct DoubletFinder {
    runtime: GpuRuntime,
}

impl DoubletFinder {
    /// Create a finder on the default CUDA device.
    pub fn new() -> Result<Self> {
        Ok(Self {
            runtime: GpuRuntime::new().context("Failed to create GPU runtime")?,
        })
    }

    /// Create a finder on a specific CUDA device.
    pub fn with_device_id(device_id: usize) -> Result<Self> {
        Ok(Self {
            runtime: GpuRuntime::with_device_id(device_id)
                .context("Failed to create GPU runtime")?,
        })
    }

    /// Wrap an existing runtime.
    pub fn from_runtime(runtime: GpuRuntime) -> Self {
        Self { runtime }
    }

    /// Run both doublet passes for one event.
    ///
    /// All-or-nothing: on any failure the whole event is abandoned and no
    /// partial output escapes.
    pub fn run(&self, grid: &SpacepointGrid, config: &SeedFinderConfig) -> Result<DoubletOutput> {
        let client = self.runtime.client();
        let data = DeviceGridData::flatten(grid);
        let n = data.n_spacepoints;

        if n == 0 {
            return Ok(empty_output(grid));
        }

        debug!(
            spacepoints = n,
            bins = data.n_bins,
            "launching doublet counting"
        );

        let device_grid = DeviceGrid::upload(client, &data);

        // Counting outputs: dense counters plus the elastic per-bin
        // candidate container (capacity: every spacepoint of the bin).
        let counter_handle =
            client.empty(n * COUNTER_WORDS as usize * std::mem::size_of::<u32>());
        let bin_headers: Vec<u32> = (0..data.n_bins as u32).collect();
        let bin_caps: Vec<u32> = (0..data.n_bins)
            .map(|b| data.bin_offsets[b + 1] - data.bin_offsets[b])
            .collect();
        let candidate_buffer: ContainerBuffer<u32, u32> =
            ContainerBuffer::elastic(client, &bin_headers, &bin_caps)
                .context("Failed to allocate candidate container")?;
        let candidate_view = candidate_buffer.view();

        let cube_count = n.div_ceil(256) as u32;
        let cube_dim = CubeDim::new(256, 1, 1);

        unsafe {
            count_doublets_kernel::launch_unchecked::<f32, CudaRuntime>(
                client,
                CubeCount::Static(cube_count, 1, 1),
                cube_dim,
                ArrayArg::from_raw_parts::<f32>(&device_grid.sp_params, n * 4, 1),
                ArrayArg::from_raw_parts::<u32>(&device_grid.sp_bin, n, 1),
                ArrayArg::from_raw_parts::<u32>(&device_grid.bin_offsets, data.n_bins + 1, 1),
                ArrayArg::from_raw_parts::<i32>(
                    &device_grid.neighbor_bins,
                    data.neighbor_bins.len(),
                    1,
                ),
                ScalarArg::new(config.delta_r_min),
                ScalarArg::new(config.delta_r_max),
                ScalarArg::new(config.cot_theta_max),
                ScalarArg::new(config.collision_region_min),
                ScalarArg::new(config.collision_region_max),
                ScalarArg::new(n as u32),
                ArrayArg::from_raw_parts::<u32>(&counter_handle, n * COUNTER_WORDS as usize, 1),
                ArrayArg::from_raw_parts::<u32>(
                    candidate_view.items,
                    candidate_view.item_words().max(1),
                    1,
                ),
                ArrayArg::from_raw_parts::<u32>(candidate_view.offsets, data.n_bins + 1, 1),
                ArrayArg::from_raw_parts::<u32>(candidate_view.sizes, data.n_bins, 1),
            );
        }

        // Blocking download of the counters; the sequencing point between
        // the two passes.
        let counter_bytes = client.read_one(counter_handle.clone());
        let mut counter_words = u32::from_bytes(&counter_bytes).to_vec();
        counter_words.truncate(n * COUNTER_WORDS as usize);
        let counters = unpack_slice::<DoubletCounter>(&counter_words);

        let bottom_caps: Vec<u32> = counters.iter().map(|c| c.bottom).collect();
        let top_caps: Vec<u32> = counters.iter().map(|c| c.top).collect();
        let total_bottom: u64 = bottom_caps.iter().map(|&c| u64::from(c)).sum();
        let total_top: u64 = top_caps.iter().map(|&c| u64::from(c)).sum();
        debug!(total_bottom, total_top, "sizing doublet containers");

        let bottom_buffer: ContainerBuffer<u32, Doublet> =
            ContainerBuffer::with_row_capacities(client, &data.sp_link, &bottom_caps)
                .context("Failed to allocate mid-bottom container")?;
        let top_buffer: ContainerBuffer<u32, Doublet> =
            ContainerBuffer::with_row_capacities(client, &data.sp_link, &top_caps)
                .context("Failed to allocate mid-top container")?;
        let bottom_view = bottom_buffer.view();
        let top_view = top_buffer.view();

        unsafe {
            find_doublets_kernel::launch_unchecked::<f32, CudaRuntime>(
                client,
                CubeCount::Static(cube_count, 1, 1),
                cube_dim,
                ArrayArg::from_raw_parts::<f32>(&device_grid.sp_params, n * 4, 1),
                ArrayArg::from_raw_parts::<u32>(&device_grid.sp_bin, n, 1),
                ArrayArg::from_raw_parts::<u32>(&device_grid.sp_link, n, 1),
                ArrayArg::from_raw_parts::<u32>(&device_grid.bin_offsets, data.n_bins + 1, 1),
                ArrayArg::from_raw_parts::<i32>(
                    &device_grid.neighbor_bins,
                    data.neighbor_bins.len(),
                    1,
                ),
                ScalarArg::new(config.delta_r_min),
                ScalarArg::new(config.delta_r_max),
                ScalarArg::new(config.cot_theta_max),
                ScalarArg::new(config.collision_region_min),
                ScalarArg::new(config.collision_region_max),
                ScalarArg::new(n as u32),
                ArrayArg::from_raw_parts::<u32>(bottom_view.offsets, n + 1, 1),
                ArrayArg::from_raw_parts::<u32>(top_view.offsets, n + 1, 1),
                ArrayArg::from_raw_parts::<u32>(
                    bottom_view.items,
                    bottom_view.item_words().max(1),
                    1,
                ),
                ArrayArg::from_raw_parts::<u32>(top_view.items, top_view.item_words().max(1), 1),
            );
        }

        let mid_bottom = bottom_buffer.to_host(client);
        let mid_top = top_buffer.to_host(client);
        let candidates = candidate_buffer.to_host(client);

        Ok(DoubletOutput {
            counters,
            candidates,
            mid_bottom,
            mid_top,
        })
    }

    /// The underlying compute client.
    pub fn client(&self) -> &CudaClient {
        self.runtime.client()
    }
}

/// Output for an event with no binned spacepoints.
fn empty_output(grid: &SpacepointGrid) -> DoubletOutput {
    let mut candidates = Container::with_capacity(grid.n_bins());
    for bin in 0..grid.n_bins() {
        candidates.push_row(bin as u32, Vec::new());
    }
    DoubletOutput {
        counters: Vec::new(),
        candidates,
        mid_bottom: Container::new(),
        mid_top: Container::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::doublet::find_doublets_cpu;
    use crate::grid::GridAxis;
    use crate::runtime::is_cuda_available;
    use crate::test_utils::{standard_grid, track_spacepoints};
    use std::f32::consts::PI;

    /// Skip test at runtime if CUDA is not available.
    macro_rules! require_cuda {
        () => {
            if !is_cuda_available() {
                crate::test_println!("Skipping test: CUDA not available");
                return;
            }
        };
    }

    fn row_set(row: &[Doublet]) -> HashSet<Doublet> {
        row.iter().copied().collect()
    }

    fn assert_outputs_match(gpu: &DoubletOutput, cpu: &DoubletOutput) {
        assert_eq!(gpu.counters, cpu.counters);

        assert_eq!(gpu.mid_bottom.len(), cpu.mid_bottom.len());
        assert_eq!(gpu.mid_top.len(), cpu.mid_top.len());
        for m in 0..cpu.mid_bottom.len() {
            assert_eq!(gpu.mid_bottom.header(m), cpu.mid_bottom.header(m));
            assert_eq!(
                row_set(gpu.mid_bottom.row(m)),
                row_set(cpu.mid_bottom.row(m)),
                "mid-bottom row {m} differs"
            );
            assert_eq!(
                row_set(gpu.mid_top.row(m)),
                row_set(cpu.mid_top.row(m)),
                "mid-top row {m} differs"
            );
        }

        // Candidate rows are append-ordered on the GPU; compare as sets.
        assert_eq!(gpu.candidates.len(), cpu.candidates.len());
        for bin in 0..cpu.candidates.len() {
            let gpu_row: HashSet<u32> = gpu.candidates.row(bin).iter().copied().collect();
            let cpu_row: HashSet<u32> = cpu.candidates.row(bin).iter().copied().collect();
            assert_eq!(gpu_row, cpu_row, "candidate row {bin} differs");
        }
    }

    #[test]
    fn test_gpu_matches_cpu_reference() {
        require_cuda!();
        let finder = DoubletFinder::new().expect("Failed to create doublet finder");

        let spacepoints = track_spacepoints(12, &[30.0, 60.0, 90.0]);
        let grid = standard_grid(&spacepoints);
        let config = SeedFinderConfig::default();

        let gpu = finder.run(&grid, &config).expect("GPU pipeline failed");
        let cpu = find_doublets_cpu(&grid, &config);

        let total: usize = cpu.mid_bottom.total_items() + cpu.mid_top.total_items();
        assert!(total > 0, "test event should produce doublets");
        assert_outputs_match(&gpu, &cpu);
    }

    #[test]
    fn test_gpu_repeated_runs_are_identical() {
        require_cuda!();
        let finder = DoubletFinder::new().expect("Failed to create doublet finder");

        let spacepoints = track_spacepoints(8, &[25.0, 55.0, 85.0]);
        let grid = standard_grid(&spacepoints);
        let config = SeedFinderConfig::default();

        let first = finder.run(&grid, &config).expect("GPU pipeline failed");
        let second = finder.run(&grid, &config).expect("GPU pipeline failed");

        assert_outputs_match(&first, &second);
    }

    #[test]
    fn test_gpu_empty_grid() {
        require_cuda!();
        let finder = DoubletFinder::new().expect("Failed to create doublet finder");

        let grid = SpacepointGrid::new(
            GridAxis::new(-PI, PI, 8),
            GridAxis::new(-300.0, 300.0, 4),
        );
        let output = finder
            .run(&grid, &SeedFinderConfig::default())
            .expect("GPU pipeline failed");

        assert!(output.counters.is_empty());
        assert!(output.mid_bottom.is_empty());
        assert!(output.mid_top.is_empty());
        assert_eq!(output.candidates.len(), grid.n_bins());
        assert_eq!(output.candidates.total_items(), 0);
    }
}
