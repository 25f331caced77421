//! Implementation of `zrecipe build`.

use std::path::{Path, PathBuf};

use crate::builder::{BuildDriver, BuildExecutor, BuildOutcome, BuildPlan, RecipeError, WorkDir};
use crate::core::Recipe;

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Pristine upstream source tree
    pub source: PathBuf,

    /// Working directory; replaced on every run
    pub work_dir: PathBuf,
}

/// Stage a working directory and execute one plan in it.
pub fn build(
    recipe: &Recipe,
    plan: &BuildPlan,
    opts: &BuildOptions,
    driver: &dyn BuildDriver,
) -> Result<BuildOutcome, RecipeError> {
    tracing::debug!("plan {}:\n{}", plan.id(), plan.to_json());
    let workdir = WorkDir::stage(&opts.work_dir, &opts.source, recipe)?;
    BuildExecutor::new(driver, &recipe.assets_dir).execute(plan, &workdir)
}

/// Default working directory for a plan: `target/zrecipe/<plan id>`.
pub fn default_work_dir(base: &Path, plan: &BuildPlan) -> PathBuf {
    base.join("target").join("zrecipe").join(plan.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Arch, BuildType, CompilerFamily, CompilerIdentity, Configuration, Options, Platform};
    use crate::test_support::{pristine_tree, recipe_with_assets, FakeDriver};
    use tempfile::TempDir;

    #[test]
    fn test_rebuild_starts_from_pristine_sources() {
        let tmp = TempDir::new().unwrap();
        let pristine = pristine_tree(tmp.path());
        let recipe = recipe_with_assets(tmp.path());
        let config = Configuration::new(
            Platform::FreeBsd,
            Arch::X86_64,
            CompilerIdentity::new(CompilerFamily::Clang, "15"),
            BuildType::Release,
            Options::default(),
        );
        let plan = BuildPlan::resolve(&recipe, &config);
        let opts = BuildOptions {
            source: pristine,
            work_dir: default_work_dir(tmp.path(), &plan),
        };

        // A second run would hit source drift if the first run's edits
        // survived in the working directory.
        for _ in 0..2 {
            let driver = FakeDriver::for_plan(&plan);
            let outcome = build(&recipe, &plan, &opts, &driver).unwrap();
            assert!(outcome.package_dir.join("lib/libz.a").is_file());
        }
    }
}
