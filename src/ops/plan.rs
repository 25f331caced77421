//! Implementation of `zrecipe plan`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::BuildPlan;
use crate::core::{Configuration, Recipe, RECIPE_FILE};

/// Inputs shared by every command that resolves a plan.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Profile TOML file
    pub profile: PathBuf,

    /// `key=value` overrides applied after the profile, in order
    pub overrides: Vec<String>,

    /// Recipe manifest (default: ./Recipe.toml if present, else built-in)
    pub recipe: Option<PathBuf>,
}

/// Load the recipe manifest.
///
/// Without an explicit path, `Recipe.toml` in the current directory is used
/// when present, otherwise the built-in zlib recipe.
pub fn load_recipe(path: Option<&Path>) -> Result<Recipe> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let local = PathBuf::from(RECIPE_FILE);
            if !local.exists() {
                tracing::warn!(
                    "no {} found, using the built-in zlib recipe with assets from ./assets",
                    RECIPE_FILE
                );
                return Ok(Recipe::default());
            }
            local
        }
    };

    Recipe::load(&path).with_context(|| format!("failed to load recipe {}", path.display()))
}

/// Load a profile and apply overrides.
pub fn load_configuration(profile: &Path, overrides: &[String]) -> Result<Configuration> {
    let mut config = Configuration::load(profile)
        .with_context(|| format!("failed to load profile {}", profile.display()))?;

    for assignment in overrides {
        config
            .apply_override(assignment)
            .with_context(|| format!("invalid override `{}`", assignment))?;
    }

    Ok(config)
}

/// Resolve the plan for one profile.
pub fn resolve_plan(opts: &PlanOptions) -> Result<(Recipe, BuildPlan)> {
    let recipe = load_recipe(opts.recipe.as_deref())?;
    let config = load_configuration(&opts.profile, &opts.overrides)?;
    let plan = BuildPlan::resolve(&recipe, &config);
    tracing::debug!("resolved plan {} for {}", plan.id(), config.label());
    Ok((recipe, plan))
}
