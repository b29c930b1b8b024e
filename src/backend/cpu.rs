//! Sequential host kernels.

use super::{sign_of, Backend};
use crate::tensor::{Buffer, Device, TensorData};
use ndarray::Zip;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn set(&self, alpha: TensorData, y: &mut Buffer) {
        y.fill(alpha);
    }

    fn add_scalar(&self, alpha: TensorData, y: &mut Buffer) {
        y.mapv_inplace(|v| v + alpha);
    }

    fn scale(&self, alpha: TensorData, y: &mut Buffer) {
        y.mapv_inplace(|v| v * alpha);
    }

    fn copy(&self, x: &Buffer, y: &mut Buffer) {
        y.assign(x);
    }

    fn mul(&self, a: &Buffer, b: &Buffer, out: &mut Buffer) {
        Zip::from(out)
            .and(a)
            .and(b)
            .for_each(|o, &a, &b| *o = a * b);
    }

    fn mul_assign(&self, a: &Buffer, y: &mut Buffer) {
        Zip::from(y).and(a).for_each(|y, &a| *y *= a);
    }

    fn div_assign(&self, b: &Buffer, y: &mut Buffer) {
        Zip::from(y).and(b).for_each(|y, &b| *y /= b);
    }

    fn axpby(&self, alpha: TensorData, x: &Buffer, beta: TensorData, y: &mut Buffer) {
        Zip::from(y)
            .and(x)
            .for_each(|y, &x| *y = alpha * x + beta * *y);
    }

    fn powx(&self, a: &Buffer, p: TensorData, out: &mut Buffer) {
        Zip::from(out).and(a).for_each(|o, &a| *o = a.powf(p));
    }

    fn powx_assign(&self, p: TensorData, y: &mut Buffer) {
        y.mapv_inplace(|v| v.powf(p));
    }

    fn sign(&self, x: &Buffer, out: &mut Buffer) {
        Zip::from(out).and(x).for_each(|o, &x| *o = sign_of(x));
    }

    fn sumsq(&self, x: &Buffer) -> TensorData {
        x.iter().map(|&v| v * v).sum()
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
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, ArrayD};
    use rand::SeedableRng;

    fn buf(values: &[TensorData]) -> Buffer {
        arr1(values).into_dyn()
    }

    #[test]
    fn arithmetic_kernels() {
        let be = CpuBackend;
        let a = buf(&[1.0, -2.0, 4.0]);
        let b = buf(&[2.0, 2.0, 0.5]);
        let mut out = ArrayD::zeros(a.raw_dim());

        be.mul(&a, &b, &mut out);
        assert_eq!(out, buf(&[2.0, -4.0, 2.0]));

        be.div_assign(&b, &mut out);
        assert_eq!(out, a);

        be.axpby(2.0, &b, -1.0, &mut out);
        assert_eq!(out, buf(&[3.0, 6.0, -3.0]));

        let mut signs = ArrayD::zeros(a.raw_dim());
        be.sign(&buf(&[3.0, 0.0, -3.0]), &mut signs);
        assert_eq!(signs, buf(&[1.0, 0.0, -1.0]));

        be.powx(&buf(&[4.0, 9.0, 16.0]), 0.5, &mut out);
        assert_abs_diff_eq!(out[[1]], 3.0, epsilon = 1e-6);

        be.add_scalar(1.0, &mut out);
        be.scale(2.0, &mut out);
        assert_abs_diff_eq!(out[[0]], 6.0, epsilon = 1e-6);
        assert_abs_diff_eq!(be.sumsq(&a), 21.0, epsilon = 1e-6);
    }

    #[test]
    fn gaussian_fill_is_seeded() {
        let be = CpuBackend;
        let mut a = ArrayD::zeros(ndarray::IxDyn(&[64]));
        let mut b = a.clone();
        be.fill_standard_normal(&mut StdRng::seed_from_u64(3), &mut a);
        be.fill_standard_normal(&mut StdRng::seed_from_u64(3), &mut b);
        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v != 0.0));
    }
}
