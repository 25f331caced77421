//! Implementation of `zrecipe matrix`.
//!
//! Each configuration gets its own working directory,
//! `<work_root>/<index>-<plan id>`, so concurrent builds never share a
//! source tree, a build directory or a package directory.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::builder::{BuildDriver, BuildOutcome, BuildPlan, RecipeError};
use crate::core::{Configuration, Recipe};
use crate::ops::build::{build, BuildOptions};

/// Options for a matrix run.
#[derive(Debug, Clone)]
pub struct MatrixOptions {
    /// Pristine upstream source tree
    pub source: PathBuf,

    /// Parent of the per-configuration working directories
    pub work_root: PathBuf,

    /// Concurrent configurations (None = one per CPU)
    pub jobs: Option<usize>,
}

/// Result for one configuration.
#[derive(Debug)]
pub struct MatrixResult {
    pub index: usize,
    pub configuration: String,
    pub plan_id: String,
    pub work_dir: PathBuf,
    pub duration: Duration,
    pub result: Result<BuildOutcome, RecipeError>,
}

impl MatrixResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Build every configuration. One failure never stops the others; results
/// come back in input order.
///
/// `on_done` is called from worker threads as each configuration finishes.
pub fn run_matrix<F>(
    recipe: &Recipe,
    configs: &[Configuration],
    opts: &MatrixOptions,
    driver: &dyn BuildDriver,
    on_done: F,
) -> Result<Vec<MatrixResult>>
where
    F: Fn(&MatrixResult) + Sync,
{
    let plans: Vec<BuildPlan> = configs
        .iter()
        .map(|config| BuildPlan::resolve(recipe, config))
        .collect();

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = opts.jobs {
        pool = pool.num_threads(jobs);
    }
    let pool = pool.build().context("failed to start build thread pool")?;

    tracing::info!("Building {} configuration(s)", plans.len());

    let results: Vec<MatrixResult> = pool.install(|| {
        plans
            .par_iter()
            .enumerate()
            .map(|(index, plan)| {
                let plan_id = plan.id();
                let work_dir = opts.work_root.join(format!("{}-{}", index, plan_id));
                let start = Instant::now();

                let result = build(
                    recipe,
                    plan,
                    &BuildOptions {
                        source: opts.source.clone(),
                        work_dir: work_dir.clone(),
                    },
                    driver,
                );

                let done = MatrixResult {
                    index,
                    configuration: plan.configuration.label(),
                    plan_id,
                    work_dir,
                    duration: start.elapsed(),
                    result,
                };
                on_done(&done);
                done
            })
            .collect()
    });

    Ok(results)
}
