//! High-level operations.
//!
//! This module contains the implementation of zrecipe commands.

pub mod build;
pub mod matrix;
pub mod plan;

pub use build::{build, BuildOptions};
pub use matrix::{run_matrix, MatrixOptions, MatrixResult};
pub use plan::{load_configuration, load_recipe, resolve_plan, PlanOptions};
