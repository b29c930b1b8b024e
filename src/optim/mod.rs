//! # Optimization Algorithms (`optim`)
//!
//! A solver is split in two: [`Solver`] owns the learnable parameters and the
//! steps every SGD-family method shares (gradient clipping, normalization,
//! regularization, applying the update), while an [`UpdateRule`] turns each
//! parameter's gradient into the final update direction.

use crate::context::ExecutionContext;
use crate::error::SolverError;
use crate::tensor::{Tensor, TensorData};

pub mod santa;
pub mod sgd;
pub mod solver;

pub use santa::{Santa, SantaState};
pub use sgd::Sgd;
pub use solver::{LearnableParam, SantaSolver, Solver};

/// Per-parameter update strategy plugged into a [`Solver`].
pub trait UpdateRule {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Allocates the rule's auxiliary state, one slot per learnable parameter,
    /// in the order given. Called once when the solver is built.
    fn setup(&mut self, params: &[Tensor]);

    /// Reads the gradient of parameter `param_id` and overwrites it with the
    /// update direction. The solver then applies `data -= grad`.
    ///
    /// `local_rate` is the global rate times the parameter's lr multiplier and
    /// `iter` is the zero-based iteration counter.
    fn compute_update_value(
        &mut self,
        ctx: &mut ExecutionContext,
        param_id: usize,
        param: &Tensor,
        local_rate: TensorData,
        iter: usize,
    ) -> Result<(), SolverError>;
}
