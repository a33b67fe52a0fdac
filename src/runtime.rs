//! GPU runtime management for CubeCL CUDA execution.
//!
//! Every allocating or launching operation in this crate takes the compute
//! client explicitly; there is no implicit "current device" state.

use anyhow::Result;
use cubecl::client::ComputeClient;
use cubecl::cuda::{CudaDevice, CudaRuntime};
use cubecl::prelude::*;

/// Type alias for the CUDA compute client.
pub type CudaClient =
    ComputeClient<<CudaRuntime as Runtime>::Server, <CudaRuntime as Runtime>::Channel>;

/// CUDA device handle plus its compute client.
pub struct GpuRuntime {
    /// CUDA device (kept alive for runtime lifetime)
    #[allow(dead_code)]
    device: CudaDevice,
    client: CudaClient,
}

impl GpuRuntime {
    /// Create a runtime on the default CUDA device.
    pub fn new() -> Result<Self> {
        Self::with_device_id(0)
    }

    /// Create a runtime on a specific CUDA device.
    pub fn with_device_id(device_id: usize) -> Result<Self> {
        let device = CudaDevice::new(device_id);
        let client = CudaRuntime::client(&device);
        Ok(Self { device, client })
    }

    /// The compute client used for allocation, transfer, and launches.
    pub fn client(&self) -> &CudaClient {
        &self.client
    }
}

/// Check if CUDA is available on this system.
pub fn is_cuda_available() -> bool {
    // Try to create a device - if it fails, CUDA is not available
    std::panic::catch_unwind(|| {
        let _device = CudaDevice::new(0);
    })
    .is_ok()
}
