//! # Compute Backends (`backend`)
//!
//! The element-wise kernels an update rule is written against. Each device
//! implements the trait once; rules never branch on the device.
//!
//! All binary kernels require operands of identical shape. Callers check
//! shapes before dispatching.

use crate::tensor::{Buffer, Device, TensorData};
use rand::rngs::StdRng;

pub mod cpu;
pub mod parallel;

pub use cpu::CpuBackend;
pub use parallel::ParallelBackend;

pub trait Backend: Send + Sync {
    /// Device this backend executes on.
    fn device(&self) -> Device;

    /// `y[i] = alpha`
    fn set(&self, alpha: TensorData, y: &mut Buffer);

    /// `y[i] += alpha`
    fn add_scalar(&self, alpha: TensorData, y: &mut Buffer);

    /// `y[i] *= alpha`
    fn scale(&self, alpha: TensorData, y: &mut Buffer);

    /// `y[i] = x[i]`
    fn copy(&self, x: &Buffer, y: &mut Buffer);

    /// `out[i] = a[i] * b[i]`
    fn mul(&self, a: &Buffer, b: &Buffer, out: &mut Buffer);

    /// `y[i] *= a[i]`
    fn mul_assign(&self, a: &Buffer, y: &mut Buffer);

    /// `y[i] /= b[i]`
    fn div_assign(&self, b: &Buffer, y: &mut Buffer);

    /// `y[i] = alpha * x[i] + beta * y[i]`
    fn axpby(&self, alpha: TensorData, x: &Buffer, beta: TensorData, y: &mut Buffer);

    /// `out[i] = a[i] ^ p`
    fn powx(&self, a: &Buffer, p: TensorData, out: &mut Buffer);

    /// `y[i] = y[i] ^ p`
    fn powx_assign(&self, p: TensorData, y: &mut Buffer);

    /// `out[i] = sign(x[i])`, with `sign(0) = 0`
    fn sign(&self, x: &Buffer, out: &mut Buffer);

    /// Sum of squares of all elements.
    fn sumsq(&self, x: &Buffer) -> TensorData;

    /// Fills `y` with independent N(0, 1) draws from `rng`.
    fn fill_standard_normal(&self, rng: &mut StdRng, y: &mut Buffer);
}

/// Sign with `sign(0) = 0`, shared by every backend.
#[inline]
pub(crate) fn sign_of(v: TensorData) -> TensorData {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
