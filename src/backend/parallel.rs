//! # Data-Parallel Kernels
//!
//! Same arithmetic as [`CpuBackend`](super::CpuBackend), split across the
//! rayon thread pool. Gaussian draws stay sequential so both backends consume
//! the RNG stream in the same order and produce the same noise.

use super::{sign_of, Backend};
use crate::tensor::{Buffer, Device, TensorData};
use ndarray::parallel::prelude::*;
use ndarray::Zip;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::slice::ParallelSlice;

// elements per task for reductions over contiguous buffers
const REDUCE_CHUNK: usize = 1 << 14;

#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelBackend;

impl Backend for ParallelBackend {
    fn device(&self) -> Device {
        Device::Parallel
    }

    fn set(&self, alpha: TensorData, y: &mut Buffer) {
        y.par_mapv_inplace(|_| alpha);
    }

    fn add_scalar(&self, alpha: TensorData, y: &mut Buffer) {
        y.par_mapv_inplace(|v| v + alpha);
    }

    fn scale(&self, alpha: TensorData, y: &mut Buffer) {
        y.par_mapv_inplace(|v| v * alpha);
    }

    fn copy(&self, x: &Buffer, y: &mut Buffer) {
        Zip::from(y).and(x).par_for_each(|y, &x| *y = x);
    }

    fn mul(&self, a: &Buffer, b: &Buffer, out: &mut Buffer) {
        Zip::from(out)
            .and(a)
            .and(b)
            .par_for_each(|o, &a, &b| *o = a * b);
    }

    fn mul_assign(&self, a: &Buffer, y: &mut Buffer) {
        Zip::from(y).and(a).par_for_each(|y, &a| *y *= a);
    }

    fn div_assign(&self, b: &Buffer, y: &mut Buffer) {
        Zip::from(y).and(b).par_for_each(|y, &b| *y /= b);
    }

    fn axpby(&self, alpha: TensorData, x: &Buffer, beta: TensorData, y: &mut Buffer) {
        Zip::from(y)
            .and(x)
            .par_for_each(|y, &x| *y = alpha * x + beta * *y);
    }

    fn powx(&self, a: &Buffer, p: TensorData, out: &mut Buffer) {
        Zip::from(out).and(a).par_for_each(|o, &a| *o = a.powf(p));
    }

    fn powx_assign(&self, p: TensorData, y: &mut Buffer) {
        y.par_mapv_inplace(|v| v.powf(p));
    }

    fn sign(&self, x: &Buffer, out: &mut Buffer) {
        Zip::from(out).and(x).par_for_each(|o, &x| *o = sign_of(x));
    }

    fn sumsq(&self, x: &Buffer) -> TensorData {
        match x.as_slice_memory_order() {
            Some(values) => values
                .par_chunks(REDUCE_CHUNK)
                .map(|chunk| chunk.iter().map(|&v| v * v).sum::<TensorData>())
                .sum(),
            None => x.par_iter().map(|&v| v * v).sum(),
        }
    }

    fn fill_standard_normal(&self, rng: &mut StdRng, y: &mut Buffer) {
        for v in y.iter_mut() {
            *v = rng.sample(StandardNormal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use approx::assert_abs_diff_eq;
    use ndarray::{ArrayD, IxDyn};
    use rand::SeedableRng;

    fn ramp(n: usize, offset: TensorData) -> Buffer {
        ArrayD::from_shape_fn(IxDyn(&[n]), |i| i[0] as TensorData * 0.01 + offset)
    }

    #[test]
    fn matches_sequential_kernels() {
        let (cpu, par) = (CpuBackend, ParallelBackend);
        let a = ramp(10_000, 0.5);
        let b = ramp(10_000, 1.0);

        let mut seq = ArrayD::zeros(IxDyn(&[10_000]));
        let mut con = seq.clone();
        cpu.mul(&a, &b, &mut seq);
        par.mul(&a, &b, &mut con);
        cpu.axpby(0.3, &a, 0.7, &mut seq);
        par.axpby(0.3, &a, 0.7, &mut con);
        cpu.powx_assign(-0.5, &mut seq);
        par.powx_assign(-0.5, &mut con);
        cpu.div_assign(&b, &mut seq);
        par.div_assign(&b, &mut con);
        assert_eq!(seq, con);

        let rel = (cpu.sumsq(&a) - par.sumsq(&a)).abs() / cpu.sumsq(&a);
        assert_abs_diff_eq!(rel, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn sumsq_in_any_memory_order() {
        let a = ArrayD::from_shape_fn(IxDyn(&[300, 200]), |i| (i[0] % 7) as TensorData - 3.0);
        let expected = CpuBackend.sumsq(&a);
        assert_abs_diff_eq!(ParallelBackend.sumsq(&a), expected, epsilon = 1e-2);

        let transposed = a.clone().reversed_axes();
        assert_abs_diff_eq!(ParallelBackend.sumsq(&transposed), expected, epsilon = 1e-2);
    }

    #[test]
    fn noise_matches_sequential_stream() {
        let mut seq = ArrayD::zeros(IxDyn(&[3, 7]));
        let mut con = seq.clone();
        CpuBackend.fill_standard_normal(&mut StdRng::seed_from_u64(11), &mut seq);
        ParallelBackend.fill_standard_normal(&mut StdRng::seed_from_u64(11), &mut con);
        assert_eq!(seq, con);
    }
}
