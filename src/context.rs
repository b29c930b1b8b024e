//! # Execution Context
//!
//! Carries the compute device and the random stream into every update call,
//! in place of a process-wide mode flag.

use crate::backend::{Backend, CpuBackend, ParallelBackend};
use crate::error::SolverError;
use crate::tensor::Device;
use rand::rngs::StdRng;
use rand::SeedableRng;

static CPU: CpuBackend = CpuBackend;
static PARALLEL: ParallelBackend = ParallelBackend;

#[derive(Debug)]
pub struct ExecutionContext {
    device: Device,
    rng: StdRng,
}

impl ExecutionContext {
    /// Creates a context for `device`. Without a seed the RNG is seeded from
    /// OS entropy.
    ///
    /// Fails with [`SolverError::UnsupportedDevice`] when no kernels exist for
    /// the device; callers treat this as fatal.
    pub fn new(device: Device, seed: Option<u64>) -> Result<Self, SolverError> {
        if let Device::Gpu(_) = device {
            return Err(SolverError::UnsupportedDevice(device));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        if device == Device::Parallel {
            log::debug!(
                "execution context on {} with {} worker threads (seeded: {})",
                device,
                rayon::current_num_threads(),
                seed.is_some()
            );
        } else {
            log::debug!("execution context on {} (seeded: {})", device, seed.is_some());
        }
        Ok(ExecutionContext { device, rng })
    }

    /// Sequential host context with a fixed seed.
    pub fn cpu(seed: u64) -> Self {
        ExecutionContext {
            device: Device::Cpu,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn backend(&self) -> &'static dyn Backend {
        match self.device {
            Device::Parallel => &PARALLEL,
            // Gpu contexts are rejected in `new`
            Device::Cpu | Device::Gpu(_) => &CPU,
        }
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Backend and RNG borrowed together, for kernels that draw noise.
    pub fn parts(&mut self) -> (&'static dyn Backend, &mut StdRng) {
        (self.backend(), &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_is_rejected() {
        match ExecutionContext::new(Device::Gpu(0), Some(1)) {
            Err(SolverError::UnsupportedDevice(Device::Gpu(0))) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn backend_follows_device() {
        let ctx = ExecutionContext::new(Device::Parallel, Some(1)).unwrap();
        assert_eq!(ctx.backend().device(), Device::Parallel);
        assert_eq!(ExecutionContext::cpu(1).backend().device(), Device::Cpu);
    }
}
