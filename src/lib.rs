//! zrecipe - deterministic build-variant orchestration for the zlib recipe
//!
//! This crate resolves a build configuration (platform, architecture,
//! compiler, build type, options) into a serializable build plan, executes
//! that plan against CMake or configure/make, and assembles a package with
//! canonical artifact names.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test fixtures and a recording fake backend driver.
#[cfg(test)]
pub mod test_support;

pub use crate::builder::{BuildOutcome, BuildPlan, RecipeError, WorkDir};
pub use crate::core::{ArtifactDescriptor, Configuration, Recipe};
