//! # Tensor Module
//!
//! Learnable parameter storage. A `Tensor` owns a value buffer and a gradient
//! buffer of the same shape; both are shared handles so the model that fills
//! the gradient and the solver that consumes it see the same memory.

use ndarray::{ArrayD, IxDyn};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod storage;

pub use storage::Device;

#[derive(thiserror::Error, Debug)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("ndarray error: {0}")]
    NdarrayError(#[from] ndarray::ShapeError),
}

/// Element type of every buffer in the crate.
pub type TensorData = f32;

/// Dense buffer type used for values, gradients and optimizer state.
pub type Buffer = ArrayD<TensorData>;

/// # Tensor
///
/// A learnable parameter: value (`data`) plus gradient (`grad`).
#[derive(Clone, Debug)]
pub struct Tensor {
    data: Arc<RwLock<Buffer>>,
    grad: Arc<RwLock<Buffer>>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Creates a new Tensor from an ndarray::ArrayD, with a zeroed gradient.
    pub fn new(data: Buffer) -> Self {
        let shape = data.shape().to_vec();
        let grad = ArrayD::zeros(IxDyn(&shape));
        Tensor {
            data: Arc::new(RwLock::new(data)),
            grad: Arc::new(RwLock::new(grad)),
            shape,
        }
    }

    /// Creates a Tensor from a flat vector laid out in row-major order.
    pub fn from_vec(shape: &[usize], values: Vec<TensorData>) -> Result<Self, TensorError> {
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)?;
        Ok(Self::new(data))
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the total number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Read access to the parameter values.
    pub fn data(&self) -> RwLockReadGuard<'_, Buffer> {
        self.data.read().expect("Tensor data RwLock poisoned")
    }

    /// Write access to the parameter values.
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Buffer> {
        self.data.write().expect("Tensor data RwLock poisoned")
    }

    /// Read access to the gradient buffer.
    pub fn grad(&self) -> RwLockReadGuard<'_, Buffer> {
        self.grad.read().expect("Tensor grad RwLock poisoned")
    }

    /// Write access to the gradient buffer.
    pub fn grad_mut(&self) -> RwLockWriteGuard<'_, Buffer> {
        self.grad.write().expect("Tensor grad RwLock poisoned")
    }

    /// Copies `grad` into the gradient buffer. Shapes must match exactly.
    pub fn set_grad(&self, grad: &Buffer) -> Result<(), TensorError> {
        if grad.shape() != self.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.clone(),
                got: grad.shape().to_vec(),
            });
        }
        self.grad_mut().assign(grad);
        Ok(())
    }

    /// Zeroes the gradient buffer.
    pub fn zero_grad(&self) {
        self.grad_mut().fill(0.0);
    }

    /// Clones the parameter values into a new buffer.
    pub fn data_clone(&self) -> Buffer {
        self.data().clone()
    }

    /// True when both handles point at the same storage.
    pub fn same_storage(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Helper to create a tensor filled with zeros.
pub fn zeros(shape: &[usize]) -> Tensor {
    Tensor::new(ArrayD::zeros(IxDyn(shape)))
}

/// Helper to create a tensor filled with ones.
pub fn ones(shape: &[usize]) -> Tensor {
    Tensor::new(ArrayD::ones(IxDyn(shape)))
}

/// Zero buffer with the same shape as `tensor`.
pub(crate) fn zeros_like(tensor: &Tensor) -> Buffer {
    ArrayD::zeros(IxDyn(tensor.shape()))
}
