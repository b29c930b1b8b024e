//! # Solver Shell
//!
//! Drives an [`UpdateRule`] over a fixed set of learnable parameters. One call
//! to [`Solver::step`] is one outer training iteration.

use super::{Santa, UpdateRule};
use crate::backend::Backend;
use crate::config::{Regularization, SolverConfig};
use crate::context::ExecutionContext;
use crate::error::SolverError;
use crate::tensor::{zeros_like, Buffer, Tensor, TensorData, TensorError};

/// A learnable tensor plus its per-parameter multipliers.
#[derive(Clone, Debug)]
pub struct LearnableParam {
    pub tensor: Tensor,
    pub lr_mult: TensorData,
    pub decay_mult: TensorData,
}

impl LearnableParam {
    pub fn new(tensor: Tensor, lr_mult: TensorData, decay_mult: TensorData) -> Self {
        LearnableParam {
            tensor,
            lr_mult,
            decay_mult,
        }
    }
}

impl From<Tensor> for LearnableParam {
    fn from(tensor: Tensor) -> Self {
        LearnableParam::new(tensor, 1.0, 1.0)
    }
}

pub type SantaSolver = Solver<Santa>;

pub struct Solver<R: UpdateRule> {
    config: SolverConfig,
    params: Vec<LearnableParam>,
    rule: R,
    // scratch for L1 regularization, one per parameter
    temp: Vec<Buffer>,
    iter: usize,
}

impl<R: UpdateRule> Solver<R> {
    /// Validates `config`, registers the parameters and runs the rule's setup.
    pub fn new<I, P>(params: I, config: SolverConfig, mut rule: R) -> Result<Self, SolverError>
    where
        I: IntoIterator<Item = P>,
        P: Into<LearnableParam>,
    {
        config.validate()?;
        let params: Vec<LearnableParam> = params.into_iter().map(Into::into).collect();
        let tensors: Vec<Tensor> = params.iter().map(|p| p.tensor.clone()).collect();
        rule.setup(&tensors);
        let temp = tensors.iter().map(zeros_like).collect();
        log::debug!(
            "{} solver ready: {} learnable params, {} elements",
            rule.name(),
            tensors.len(),
            tensors.iter().map(Tensor::size).sum::<usize>()
        );
        Ok(Solver {
            config,
            params,
            rule,
            temp,
            iter: 0,
        })
    }

    /// Performs one iteration with the precomputed learning rate `rate`.
    ///
    /// Gradient shapes are checked up front; on error no parameter, gradient
    /// or rule state has been modified.
    pub fn step(&mut self, ctx: &mut ExecutionContext, rate: TensorData) -> Result<(), SolverError> {
        self.check_grad_shapes()?;
        let backend = ctx.backend();
        self.clip_gradients(backend);
        for param_id in 0..self.params.len() {
            self.normalize(backend, param_id);
            self.regularize(backend, param_id);
            let param = &self.params[param_id];
            let local_rate = rate * param.lr_mult;
            self.rule
                .compute_update_value(ctx, param_id, &param.tensor, local_rate, self.iter)?;
        }
        self.apply_update(backend);
        self.iter += 1;
        Ok(())
    }

    /// Zeroes every parameter's gradient.
    pub fn zero_grad(&self) {
        for param in &self.params {
            param.tensor.zero_grad();
        }
    }

    /// Number of completed iterations.
    pub fn iter(&self) -> usize {
        self.iter
    }

    pub fn params(&self) -> &[LearnableParam] {
        &self.params
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn check_grad_shapes(&self) -> Result<(), TensorError> {
        for param in &self.params {
            let grad = param.tensor.grad();
            if grad.shape() != param.tensor.shape() {
                return Err(TensorError::ShapeMismatch {
                    expected: param.tensor.shape().to_vec(),
                    got: grad.shape().to_vec(),
                });
            }
        }
        Ok(())
    }

    fn clip_gradients(&self, backend: &dyn Backend) {
        let clip = self.config.clip_gradients;
        if clip < 0.0 {
            return;
        }
        let sumsq: TensorData = self
            .params
            .iter()
            .map(|p| backend.sumsq(&p.tensor.grad()))
            .sum();
        let l2norm = sumsq.sqrt();
        if l2norm > clip {
            let scale = clip / l2norm;
            log::info!(
                "Gradient clipping: scaling down gradients (L2 norm {} > {}) by scale factor {}",
                l2norm,
                clip,
                scale
            );
            for param in &self.params {
                backend.scale(scale, &mut param.tensor.grad_mut());
            }
        }
    }

    fn normalize(&self, backend: &dyn Backend, param_id: usize) {
        if self.config.iter_size == 1 {
            return;
        }
        let scale = 1.0 / self.config.iter_size as TensorData;
        backend.scale(scale, &mut self.params[param_id].tensor.grad_mut());
    }

    fn regularize(&mut self, backend: &dyn Backend, param_id: usize) {
        let param = &self.params[param_id];
        let local_decay = self.config.weight_decay * param.decay_mult;
        if local_decay == 0.0 {
            return;
        }
        let data = param.tensor.data();
        let mut grad = param.tensor.grad_mut();
        match self.config.regularization {
            Regularization::L2 => backend.axpby(local_decay, &data, 1.0, &mut grad),
            Regularization::L1 => {
                let temp = &mut self.temp[param_id];
                backend.sign(&data, temp);
                backend.axpby(local_decay, temp, 1.0, &mut grad);
            }
        }
    }

    fn apply_update(&self, backend: &dyn Backend) {
        for param in &self.params {
            let grad = param.tensor.grad();
            backend.axpby(-1.0, &grad, 1.0, &mut param.tensor.data_mut());
        }
    }
}

impl Solver<Santa> {
    /// Santa solver configured from `config.santa`.
    pub fn santa<I, P>(params: I, config: SolverConfig) -> Result<Self, SolverError>
    where
        I: IntoIterator<Item = P>,
        P: Into<LearnableParam>,
    {
        let rule = Santa::new(config.santa.clone());
        Solver::new(params, config, rule)
    }
}
