//! # Solver Errors

use crate::tensor::{Device, TensorError};

#[derive(thiserror::Error, Debug)]
pub enum SolverError {
    #[error("Tensor error: {0}")]
    Tensor(#[from] TensorError),
    #[error("Unsupported compute device: {0}")]
    UnsupportedDevice(Device),
    #[error("Invalid solver configuration: {0}")]
    InvalidConfig(String),
    #[error("Parameter index {id} out of range ({len} learnable parameters)")]
    ParamOutOfRange { id: usize, len: usize },
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}
