//! # Santa Update Rule
//!
//! Stochastic gradient MCMC with an RMSProp-style preconditioner, a
//! thermostat variable and annealed noise. During the exploration phase
//! (`t < explore`) Gaussian noise is injected and the thermostat tracks the
//! kinetic energy of `u_t`; afterwards the rule refines deterministically.
//!
//! Reference: Chen et al., "Bridging the Gap between Stochastic Gradient MCMC
//! and Stochastic Optimization", AISTATS 2016 - https://arxiv.org/abs/1512.07962
//!
//! With `t = iter + 1`, `eta = sqrt(lr / nd)` and
//! `anneal = anneal_a * (t + anneal_b)^anneal_c`, one update is:
//!
//! ```text
//! t == 1:          alpha = c * eta;  u = eta * N(0, 1);  g = 1 unless pc
//! pc:              v = (1 - sigma) * grad^2 + sigma * v
//!                  g = (sqrt(v) + lambda)^-0.5
//! explore|update_u alpha += u^2 - lr / anneal / nd
//! approx correction (explore, approx_g, pc, t > 1):
//!                  g_prev = (g_prev / g - 1) / u * (-lr / nd / anneal)
//!                  u -= alpha * u
//!                  u += lr * g * grad
//! explore:         u += sqrt(z^2 * g * 2 * (lr / nd)^1.5 / anneal),  z ~ N(0, 1)
//!                  approx_g: u += g_prev (t > 1), then g_prev = g
//!                  grad = g * u
//! ```

use super::UpdateRule;
use crate::config::SantaConfig;
use crate::context::ExecutionContext;
use crate::error::SolverError;
use crate::tensor::{zeros_like, Buffer, Tensor, TensorData, TensorError};

/// Auxiliary buffers of one learnable parameter. All share the parameter's
/// shape and are never shared between parameters.
#[derive(Debug, Clone)]
pub struct SantaState {
    v_t: Buffer,
    g_t: Buffer,
    alpha_t: Buffer,
    u_t: Buffer,
    g_prev: Option<Buffer>,
    scratch: Buffer,
}

impl SantaState {
    fn new(param: &Tensor, approx_g: bool) -> Self {
        SantaState {
            v_t: zeros_like(param),
            g_t: zeros_like(param),
            alpha_t: zeros_like(param),
            u_t: zeros_like(param),
            g_prev: approx_g.then(|| zeros_like(param)),
            scratch: zeros_like(param),
        }
    }

    /// Moving average of the squared gradient.
    pub fn v_t(&self) -> &Buffer {
        &self.v_t
    }

    /// Current preconditioner.
    pub fn g_t(&self) -> &Buffer {
        &self.g_t
    }

    /// Thermostat.
    pub fn alpha_t(&self) -> &Buffer {
        &self.alpha_t
    }

    /// Momentum-like auxiliary variable.
    pub fn u_t(&self) -> &Buffer {
        &self.u_t
    }

    /// Previous preconditioner (or pending correction term). `None` unless
    /// `approx_g` was set at setup.
    pub fn g_prev(&self) -> Option<&Buffer> {
        self.g_prev.as_ref()
    }

    pub fn shape(&self) -> &[usize] {
        self.u_t.shape()
    }

    /// State buffers in fixed order: `v_t`, `g_t`, `alpha_t`, `u_t`, then
    /// `g_prev` when allocated.
    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> + '_ {
        [&self.v_t, &self.g_t, &self.alpha_t, &self.u_t]
            .into_iter()
            .chain(self.g_prev.iter())
    }
}

#[derive(Debug, Clone)]
pub struct Santa {
    config: SantaConfig,
    states: Vec<SantaState>,
}

impl Santa {
    /// The config is used as given; validation happens in
    /// [`SolverConfig::validate`](crate::config::SolverConfig::validate).
    pub fn new(config: SantaConfig) -> Self {
        Santa {
            config,
            states: Vec::new(),
        }
    }

    pub fn config(&self) -> &SantaConfig {
        &self.config
    }

    pub fn state(&self, param_id: usize) -> Option<&SantaState> {
        self.states.get(param_id)
    }

    pub fn states(&self) -> &[SantaState] {
        &self.states
    }

    /// Annealing factor at one-based iteration `t`.
    pub fn annealing(&self, t: usize) -> TensorData {
        let cfg = &self.config;
        cfg.anneal_a * (t as TensorData + cfg.anneal_b).powf(cfg.anneal_c)
    }

    /// True while one-based iteration `t` is in the exploration phase.
    pub fn exploring(&self, t: usize) -> bool {
        t < self.config.explore
    }
}

impl UpdateRule for Santa {
    fn name(&self) -> &'static str {
        "santa"
    }

    fn setup(&mut self, params: &[Tensor]) {
        let approx_g = self.config.approx_g;
        self.states = params
            .iter()
            .map(|p| SantaState::new(p, approx_g))
            .collect();
        let per_param = if approx_g { 5 } else { 4 };
        log::debug!(
            "santa: allocated {} state buffers for {} params (approx_g: {})",
            per_param * self.states.len(),
            self.states.len(),
            approx_g
        );
    }

    fn compute_update_value(
        &mut self,
        ctx: &mut ExecutionContext,
        param_id: usize,
        param: &Tensor,
        local_rate: TensorData,
        iter: usize,
    ) -> Result<(), SolverError> {
        let t = iter + 1;
        let anneal = self.annealing(t);
        let exploring = self.exploring(t);
        let len = self.states.len();
        let cfg = &self.config;
        let state = self
            .states
            .get_mut(param_id)
            .ok_or(SolverError::ParamOutOfRange { id: param_id, len })?;

        let mut grad = param.grad_mut();
        if grad.shape() != state.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: state.shape().to_vec(),
                got: grad.shape().to_vec(),
            }
            .into());
        }

        let nd = cfg.nd as TensorData;
        let eta = (local_rate / nd).sqrt();
        if param_id == 0 && cfg.explore > 0 && t == cfg.explore {
            log::info!("santa: exploration ended, refining from iteration {}", t);
        }
        log::trace!(
            "santa: param {} t={} eta={} anneal={} exploring={}",
            param_id,
            t,
            eta,
            anneal,
            exploring
        );

        let (backend, rng) = ctx.parts();
        let SantaState {
            v_t,
            g_t,
            alpha_t,
            u_t,
            g_prev,
            scratch,
        } = state;

        if t == 1 {
            // alpha_t is zero from setup
            backend.add_scalar(cfg.c * eta, alpha_t);
            backend.fill_standard_normal(rng, u_t);
            backend.scale(eta, u_t);
            if !cfg.pc {
                backend.set(1.0, g_t);
            }
        }

        // preconditioner
        if cfg.pc {
            backend.mul(&grad, &grad, scratch);
            backend.axpby(1.0 - cfg.sigma, scratch, cfg.sigma, v_t);
            backend.powx(v_t, 0.5, scratch);
            backend.add_scalar(cfg.lambda, scratch);
            backend.powx(scratch, -0.5, g_t);
        }

        // thermostat
        if exploring || cfg.update_u {
            backend.mul(&*u_t, &*u_t, scratch);
            backend.add_scalar(-local_rate / anneal / nd, scratch);
            backend.axpby(1.0, scratch, 1.0, alpha_t);
        }

        if exploring && t > 1 && cfg.pc {
            if let Some(g_prev) = g_prev.as_mut() {
                backend.div_assign(g_t, g_prev);
                backend.add_scalar(-1.0, g_prev);
                backend.div_assign(u_t, g_prev);
                backend.scale(-local_rate / nd / anneal, g_prev);
            }
        }

        // friction, then preconditioned drift
        backend.mul(alpha_t, u_t, scratch);
        backend.axpby(-1.0, scratch, 1.0, u_t);
        backend.mul(g_t, &grad, scratch);
        backend.axpby(local_rate, scratch, 1.0, u_t);

        if exploring {
            backend.fill_standard_normal(rng, scratch);
            backend.powx_assign(2.0, scratch);
            backend.mul_assign(g_t, scratch);
            backend.scale(2.0 * (local_rate / nd).powf(1.5) / anneal, scratch);
            backend.powx_assign(0.5, scratch);
            backend.axpby(1.0, scratch, 1.0, u_t);
            if let Some(g_prev) = g_prev.as_mut() {
                if t > 1 {
                    backend.axpby(1.0, g_prev, 1.0, u_t);
                }
                backend.copy(g_t, g_prev);
            }
        }

        backend.mul(g_t, u_t, &mut grad);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, ArrayD, IxDyn};

    fn grad_param(values: &[TensorData]) -> Tensor {
        let t = Tensor::new(ArrayD::zeros(IxDyn(&[values.len()])));
        t.set_grad(&arr1(values).into_dyn()).unwrap();
        t
    }

    fn rule(config: SantaConfig, params: &[Tensor]) -> Santa {
        let mut santa = Santa::new(config);
        santa.setup(params);
        santa
    }

    #[test]
    fn setup_allocates_matching_shapes() {
        let a = Tensor::new(ArrayD::zeros(IxDyn(&[2, 3])));
        let b = Tensor::new(ArrayD::zeros(IxDyn(&[5])));
        let santa = rule(SantaConfig::default(), &[a, b]);
        assert_eq!(santa.states().len(), 2);
        assert_eq!(santa.state(0).unwrap().shape(), &[2, 3]);
        assert_eq!(santa.state(1).unwrap().buffers().count(), 4);
        assert!(santa.state(1).unwrap().buffers().all(|b| b.shape() == [5]));
        assert!(santa.state(0).unwrap().g_prev().is_none());

        let c = Tensor::new(ArrayD::zeros(IxDyn(&[5])));
        let config = SantaConfig {
            approx_g: true,
            ..SantaConfig::default()
        };
        let santa = rule(config, &[c]);
        assert_eq!(santa.state(0).unwrap().buffers().count(), 5);
    }

    #[test]
    fn annealing_schedule() {
        let santa = Santa::new(SantaConfig {
            anneal_a: 2.0,
            anneal_b: 1.0,
            anneal_c: 0.5,
            explore: 10,
            ..SantaConfig::default()
        });
        assert_abs_diff_eq!(santa.annealing(3), 4.0, epsilon = 1e-6);
        assert!(santa.exploring(9));
        assert!(!santa.exploring(10));
    }

    #[test]
    fn initialization_on_first_iteration() {
        let config = SantaConfig {
            c: 3.0,
            nd: 4,
            pc: false,
            ..SantaConfig::default()
        };
        let w = grad_param(&[0.0, 0.0, 0.0]);
        let mut santa = rule(config, &[w.clone()]);
        let mut ctx = ExecutionContext::cpu(5);
        santa.compute_update_value(&mut ctx, 0, &w, 0.16, 0).unwrap();

        let state = santa.state(0).unwrap();
        // eta = sqrt(0.16 / 4)
        let eta = 0.2;
        assert!(state.alpha_t().iter().all(|&a| (a - 3.0 * eta).abs() < 1e-6));
        assert!(state.g_t().iter().all(|&g| g == 1.0));
        // zero gradient, outside exploration: u = (1 - alpha) * eta * z
        assert!(state.u_t().iter().any(|&u| u != 0.0));
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let w = grad_param(&[1.0, 2.0]);
        let mut santa = rule(SantaConfig::default(), &[w]);
        let other = grad_param(&[1.0, 2.0, 3.0]);
        let err = santa
            .compute_update_value(&mut ExecutionContext::cpu(0), 0, &other, 0.1, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            SolverError::Tensor(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn out_of_range_param() {
        let w = grad_param(&[1.0]);
        let mut santa = rule(SantaConfig::default(), &[w.clone()]);
        let err = santa
            .compute_update_value(&mut ExecutionContext::cpu(0), 1, &w, 0.1, 0)
            .unwrap_err();
        assert!(matches!(err, SolverError::ParamOutOfRange { id: 1, len: 1 }));
    }
}
