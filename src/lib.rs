//! # santa_optim
//!
//! The Santa optimizer for Rust training loops: annealed stochastic-gradient
//! MCMC with an adaptive preconditioner and a thermostat, plus the small
//! solver shell it runs in (clipping, regularization, update application).
//!
//! ```no_run
//! use santa_optim::{config::SolverConfig, context::ExecutionContext, optim::Solver, tensor};
//!
//! let w = tensor::zeros(&[128, 64]);
//! let mut config = SolverConfig::default();
//! config.santa.explore = 1_000;
//! let mut ctx = ExecutionContext::new(config.device, config.random_seed)?;
//! let mut solver = Solver::santa(vec![w.clone()], config)?;
//! // ... backprop fills w's gradient ...
//! solver.step(&mut ctx, 4e-6)?;
//! # Ok::<(), santa_optim::error::SolverError>(())
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod optim;
pub mod tensor;

#[cfg(feature = "python")]
pub mod bindings;

pub mod prelude {
    pub use crate::config::{Regularization, SantaConfig, SolverConfig};
    pub use crate::context::ExecutionContext;
    pub use crate::error::SolverError;
    pub use crate::optim::{LearnableParam, Santa, SantaSolver, Sgd, Solver, UpdateRule};
    pub use crate::tensor::{Device, Tensor, TensorData};
}
