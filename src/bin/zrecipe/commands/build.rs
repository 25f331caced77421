//! `zrecipe build` command

use std::time::Instant;

use anyhow::Result;

use crate::cli::{BuildArgs, MessageFormat};
use crate::commands::tool_config;
use zrecipe::builder::{BuildEvent, HostDriver};
use zrecipe::ops::build::default_work_dir;
use zrecipe::ops::{build, resolve_plan, BuildOptions, PlanOptions};

pub fn execute(args: BuildArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let json = args.message_format == MessageFormat::Json;

    let (recipe, plan) = resolve_plan(&PlanOptions {
        profile: args.profile,
        overrides: args.overrides.overrides(),
        recipe: args.overrides.recipe,
    })?;
    let plan_id = plan.id();

    if json {
        println!(
            "{}",
            BuildEvent::plan_resolved(
                &plan_id,
                plan.configuration.label(),
                plan.backend.as_str(),
                &plan.library.target
            )
            .to_json()
        );
    }

    // Jobs: CLI > config > backend default
    let driver = HostDriver::from_config(&tool_config(&cwd)).jobs(args.jobs);
    let opts = BuildOptions {
        source: args.source,
        work_dir: args
            .work_dir
            .unwrap_or_else(|| default_work_dir(&cwd, &plan)),
    };

    let start = Instant::now();
    let result = build(&recipe, &plan, &opts, &driver);
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(outcome) => {
            if json {
                for file in &outcome.files {
                    println!(
                        "{}",
                        BuildEvent::artifact(&plan_id, file.path.clone(), file.sha256.clone()).to_json()
                    );
                }
                println!(
                    "{}",
                    BuildEvent::finished(&plan_id, true, duration_ms)
                        .with_artifacts(outcome.files.len())
                        .to_json()
                );
            } else {
                for file in &outcome.files {
                    eprintln!("    Packaged {}", file.path.display());
                }
                eprintln!(
                    "    Finished {} ({}) -> {} in {:.2}s",
                    outcome.configuration,
                    plan_id,
                    outcome.package_dir.display(),
                    duration_ms as f64 / 1000.0
                );
            }
            Ok(())
        }
        Err(err) => {
            if json {
                println!("{}", BuildEvent::failure(&plan_id, &err).to_json());
                println!("{}", BuildEvent::finished(&plan_id, false, duration_ms).to_json());
            }
            Err(err.into())
        }
    }
}
