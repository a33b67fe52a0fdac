//! CubeCL-based CUDA doublet finding for particle track seeding.
//!
//! This library implements the first combinatorial stage of track seed
//! reconstruction: turning a spatial grid of detector spacepoints into
//! mid-bottom and mid-top doublet candidates, executed as data-parallel
//! GPU work with no dynamic allocation inside kernels.
//!
//! # Architecture
//!
//! The algorithm runs in two passes over a phi-z spacepoint grid:
//! - Pass 1: Count compatible bottom/top partners per middle spacepoint
//! - Host: Derive exact output row sizes from the counts (prefix sums)
//! - Pass 2: Fill exactly-sized doublet containers, each work item writing
//!   only into its own pre-sized row
//!
//! Counting before filling replaces dynamic growth under parallel writers:
//! every row's final length is known before the fill kernel launches, so no
//! work item ever contends for space with another.
//!
//! Data moves between host and device through a jagged container primitive
//! with three faces: a host [`Container`], a device-owning
//! [`ContainerBuffer`], and a borrowed [`ContainerView`] consumed at kernel
//! launch.
//!
//! # Usage
//!
//! ```ignore
//! use seed_cuda::{DoubletFinder, GridAxis, SeedFinderConfig, SpacepointGrid};
//!
//! let phi_axis = GridAxis::new(-std::f32::consts::PI, std::f32::consts::PI, 32);
//! let z_axis = GridAxis::new(-500.0, 500.0, 16);
//! let mut grid = SpacepointGrid::new(phi_axis, z_axis);
//! for (link, sp) in spacepoints.iter().enumerate() {
//!     grid.insert(link as u32, sp);
//! }
//!
//! let finder = DoubletFinder::new()?;
//! let output = finder.run(&grid, &SeedFinderConfig::default())?;
//! println!("mid-bottom doublets: {}", output.mid_bottom.total_items());
//! ```

pub mod config;
pub mod container;
pub mod doublet;
pub mod grid;
pub mod runtime;
pub mod spacepoint;
pub mod test_utils;

pub use config::SeedFinderConfig;
pub use container::{Container, ContainerBuffer, ContainerData, ContainerError, ContainerView};
pub use doublet::{
    count_doublets_cpu, find_doublets_cpu, Doublet, DoubletCounter, DoubletFinder, DoubletOutput,
};
pub use grid::{DeviceGrid, DeviceGridData, GridAxis, SpacepointGrid, MAX_NEIGHBOR_BINS};
pub use runtime::{is_cuda_available, CudaClient, GpuRuntime};
pub use spacepoint::{InternalSpacepoint, Spacepoint};

/// Print from tests without polluting non-test builds.
///
/// GPU tests use this to report runtime skips and sizes.
#[macro_export]
macro_rules! test_println {
    ($($arg:tt)*) => {
        println!($($arg)*)
    };
}
