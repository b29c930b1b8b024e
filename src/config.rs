//! # Solver Configuration
//!
//! Hyperparameters consumed by the solver shell and the Santa rule. Every
//! field has a default, so a config file only names what it changes:
//!
//! ```json
//! { "device": "parallel", "random_seed": 7,
//!   "santa": { "explore": 2000, "approx_g": true } }
//! ```

use crate::error::SolverError;
use crate::tensor::{Device, TensorData};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regularization {
    L1,
    L2,
}

impl Default for Regularization {
    fn default() -> Self {
        Regularization::L2
    }
}

/// Santa hyperparameters. Field names follow the usual solver prototxt keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SantaConfig {
    /// Decay of the squared-gradient moving average.
    pub sigma: TensorData,
    /// Initial thermostat scale; `alpha_t` starts at `c * sqrt(lr / nd)`.
    pub c: TensorData,
    /// Added to `sqrt(v_t)` before the inverse square root.
    pub lambda: TensorData,
    /// Iteration at which the exploration phase ends (noise injection and
    /// thermostat updates stop). 0 disables exploration.
    pub explore: usize,
    /// Sub-steps per outer step; the step size is `sqrt(lr / nd)`.
    pub nd: u32,
    /// Keep updating the thermostat after exploration ends.
    pub update_u: bool,
    /// Enable the adaptive preconditioner. When off, `g_t` is the identity.
    pub pc: bool,
    /// Approximate the preconditioner-gradient term from the change in `g_t`.
    pub approx_g: bool,
    pub anneal_a: TensorData,
    pub anneal_b: TensorData,
    pub anneal_c: TensorData,
}

impl Default for SantaConfig {
    fn default() -> Self {
        SantaConfig {
            sigma: 0.999,
            c: 100.0,
            lambda: 1e-8,
            explore: 0,
            nd: 1,
            update_u: false,
            pc: true,
            approx_g: false,
            anneal_a: 1.0,
            anneal_b: 0.0,
            anneal_c: 0.5,
        }
    }
}

impl SantaConfig {
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(0.0..1.0).contains(&self.sigma) {
            return Err(SolverError::InvalidConfig(format!(
                "sigma must be in [0, 1), got {}",
                self.sigma
            )));
        }
        if !(self.lambda > 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "lambda must be > 0, got {}",
                self.lambda
            )));
        }
        if self.c < 0.0 {
            return Err(SolverError::InvalidConfig(format!("c must be >= 0, got {}", self.c)));
        }
        if self.nd == 0 {
            return Err(SolverError::InvalidConfig("nd must be >= 1".into()));
        }
        if !(self.anneal_a > 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "anneal_a must be > 0, got {}",
                self.anneal_a
            )));
        }
        // anneal must stay positive from t = 1 onwards
        if !(1.0 + self.anneal_b > 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "anneal_b must be > -1, got {}",
                self.anneal_b
            )));
        }
        Ok(())
    }
}

/// Solver-level settings (the SGD-family shell around the update rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub weight_decay: TensorData,
    pub regularization: Regularization,
    /// Global L2-norm clipping threshold; negative disables clipping.
    pub clip_gradients: TensorData,
    /// Number of accumulated mini-batches per step; gradients are divided by it.
    pub iter_size: usize,
    /// Momentum of the plain `Sgd` rule. Unused by Santa.
    pub momentum: TensorData,
    pub device: Device,
    pub random_seed: Option<u64>,
    pub santa: SantaConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            weight_decay: 0.0,
            regularization: Regularization::L2,
            clip_gradients: -1.0,
            iter_size: 1,
            momentum: 0.0,
            device: Device::Cpu,
            random_seed: None,
            santa: SantaConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, SolverError> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SolverError> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("loading solver config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, SolverError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if self.weight_decay < 0.0 {
            return Err(SolverError::InvalidConfig(format!(
                "weight_decay must be >= 0, got {}",
                self.weight_decay
            )));
        }
        if self.iter_size == 0 {
            return Err(SolverError::InvalidConfig("iter_size must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(SolverError::InvalidConfig(format!(
                "momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }
        self.santa.validate()
    }
}
