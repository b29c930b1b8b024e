//! # Stochastic Gradient Descent (SGD) Update Rule

use super::UpdateRule;
use crate::context::ExecutionContext;
use crate::error::SolverError;
use crate::tensor::{zeros_like, Buffer, Tensor, TensorData, TensorError};

/// Momentum SGD: `history = momentum * history + local_rate * grad`, and the
/// history becomes the update direction.
#[derive(Debug, Clone)]
pub struct Sgd {
    momentum: TensorData,
    // momentum buffers, one per parameter
    history: Vec<Buffer>,
}

impl Sgd {
    pub fn new(momentum: TensorData) -> Self {
        Sgd {
            momentum,
            history: Vec::new(),
        }
    }

    pub fn momentum(&self) -> TensorData {
        self.momentum
    }

    pub fn history(&self, param_id: usize) -> Option<&Buffer> {
        self.history.get(param_id)
    }
}

impl UpdateRule for Sgd {
    fn name(&self) -> &'static str {
        "sgd"
    }

    fn setup(&mut self, params: &[Tensor]) {
        self.history = params.iter().map(zeros_like).collect();
    }

    fn compute_update_value(
        &mut self,
        ctx: &mut ExecutionContext,
        param_id: usize,
        param: &Tensor,
        local_rate: TensorData,
        _iter: usize,
    ) -> Result<(), SolverError> {
        let len = self.history.len();
        let history = self
            .history
            .get_mut(param_id)
            .ok_or(SolverError::ParamOutOfRange { id: param_id, len })?;
        let mut grad = param.grad_mut();
        if grad.shape() != history.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: history.shape().to_vec(),
                got: grad.shape().to_vec(),
            }
            .into());
        }
        let backend = ctx.backend();
        backend.axpby(local_rate, &grad, self.momentum, history);
        backend.copy(history, &mut grad);
        Ok(())
    }
}
