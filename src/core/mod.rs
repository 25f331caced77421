//! Core data structures for zrecipe.
//!
//! This module contains the inputs to plan resolution:
//! - Build configurations (settings matrix and options)
//! - The recipe manifest
//! - Artifact descriptors (logical artifact to physical file names)

pub mod artifact;
pub mod config;
pub mod recipe;

pub use artifact::{ArtifactDescriptor, LibraryNaming, LogicalArtifact};
pub use config::{
    Arch, BuildType, CompilerFamily, CompilerIdentity, ConfigError, Configuration, LinkMode,
    Options, Platform, Settings,
};
pub use recipe::{PatchSpec, Recipe, RECIPE_FILE};
