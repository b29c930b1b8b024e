//! # Python Bindings (`santa_optim`)
//!
//! Exposes a Santa solver over flat `float32` parameter lists so a Python
//! training loop can drive it. Build with `maturin develop --features python`.

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::SolverConfig;
use crate::context::ExecutionContext;
use crate::error::SolverError;
use crate::optim::{SantaSolver, Solver};
use crate::tensor::{Tensor, TensorData};

impl std::convert::From<SolverError> for PyErr {
    fn from(err: SolverError) -> PyErr {
        match err {
            SolverError::Io(e) => PyIOError::new_err(e.to_string()),
            SolverError::UnsupportedDevice(_) => PyRuntimeError::new_err(err.to_string()),
            // shape, range and config problems are caller errors
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// `santa_optim.SantaSolver(params, config_json=None, seed=None)`
///
/// `params` is a list of flat parameter vectors. The solver keeps its own copy;
/// read it back with `params()` after each `step`.
#[pyclass(name = "SantaSolver")]
struct PySantaSolver {
    solver: SantaSolver,
    ctx: ExecutionContext,
}

#[pymethods]
impl PySantaSolver {
    #[new]
    #[pyo3(signature = (params, config_json=None, seed=None))]
    fn new(params: Vec<Vec<TensorData>>, config_json: Option<String>, seed: Option<u64>) -> PyResult<Self> {
        let mut config = match config_json {
            Some(json) => SolverConfig::from_json_str(&json)?,
            None => SolverConfig::default(),
        };
        if seed.is_some() {
            config.random_seed = seed;
        }
        let tensors = params
            .into_iter()
            .map(|values| Tensor::from_vec(&[values.len()], values))
            .collect::<Result<Vec<_>, _>>()
            .map_err(SolverError::from)?;
        let ctx = ExecutionContext::new(config.device, config.random_seed)?;
        let solver = Solver::santa(tensors, config)?;
        Ok(PySantaSolver { solver, ctx })
    }

    /// Sets every gradient from `grads` and performs one iteration at `rate`.
    fn step(&mut self, grads: Vec<Vec<TensorData>>, rate: TensorData) -> PyResult<()> {
        let params = self.solver.params();
        if grads.len() != params.len() {
            return Err(PyValueError::new_err(format!(
                "expected {} gradients, got {}",
                params.len(),
                grads.len()
            )));
        }
        for (param, grad) in params.iter().zip(grads) {
            let grad = ndarray::Array1::from(grad).into_dyn();
            param.tensor.set_grad(&grad).map_err(SolverError::from)?;
        }
        self.solver.step(&mut self.ctx, rate)?;
        Ok(())
    }

    /// Current parameter values.
    fn params(&self) -> Vec<Vec<TensorData>> {
        self.solver
            .params()
            .iter()
            .map(|p| p.tensor.data().iter().copied().collect())
            .collect()
    }

    #[getter]
    fn iter(&self) -> usize {
        self.solver.iter()
    }

    fn __repr__(&self) -> String {
        format!(
            "SantaSolver(params={}, iter={}, device={})",
            self.solver.params().len(),
            self.solver.iter(),
            self.ctx.device()
        )
    }
}

#[pymodule]
fn santa_optim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySantaSolver>()?;
    Ok(())
}
