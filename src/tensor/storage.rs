//! # Tensor Storage
//!
//! Device placement for parameter and optimizer buffers.

use serde::{Deserialize, Serialize};

/// Represents the device that executes the element-wise update kernels.
///
/// `Parallel` is the data-parallel path (rayon thread pool over host memory).
/// `Gpu` is accepted in configuration files but no kernels are built for it,
/// so selecting it fails when the execution context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Cpu,
    Parallel,
    Gpu(u32),
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Parallel => write!(f, "parallel"),
            Device::Gpu(id) => write!(f, "gpu:{}", id),
        }
    }
}
