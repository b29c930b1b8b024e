//! # Language Bindings
//!
//! Enabled with the `python` feature.

pub mod python;
