//! Build planning and execution.
//!
//! [`plan`] turns a configuration into a [`BuildPlan`]; [`executor`] runs a
//! plan in a staged [`WorkDir`] through a [`BuildDriver`].

pub mod autotools;
pub mod cmake;
pub mod driver;
pub mod errors;
pub mod events;
pub mod executor;
pub mod package;
pub mod patch;
pub mod plan;
pub mod workdir;

pub use driver::{BuildDriver, HostDriver};
pub use errors::RecipeError;
pub use events::BuildEvent;
pub use executor::{BuildExecutor, BuildOutcome};
pub use plan::{Backend, BuildPlan};
pub use workdir::WorkDir;
