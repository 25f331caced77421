//! `zrecipe matrix` command

use std::sync::Mutex;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{MatrixArgs, MessageFormat};
use crate::commands::tool_config;
use zrecipe::builder::{BuildEvent, HostDriver};
use zrecipe::ops::{load_configuration, load_recipe, run_matrix, MatrixOptions, MatrixResult};

pub fn execute(args: MatrixArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let json = args.message_format == MessageFormat::Json;

    let recipe = load_recipe(args.overrides.recipe.as_deref())?;
    let overrides = args.overrides.overrides();
    let configs = args
        .profiles
        .iter()
        .map(|profile| load_configuration(profile, &overrides))
        .collect::<Result<Vec<_>>>()?;

    let driver = HostDriver::from_config(&tool_config(&cwd));
    let opts = MatrixOptions {
        source: args.source,
        work_root: args.work_root,
        jobs: args.jobs,
    };

    let pb = if json {
        None
    } else {
        let pb = ProgressBar::new(configs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    // Events are printed whole, one configuration at a time
    let stdout = Mutex::new(());
    let report = |r: &MatrixResult| {
        if let Some(pb) = &pb {
            let status = match &r.result {
                Ok(_) => "ok".to_string(),
                Err(e) => format!("FAILED ({})", e.kind()),
            };
            pb.println(format!("    {} {} [{}]", status, r.configuration, r.plan_id));
            pb.inc(1);
        } else if let Ok(_guard) = stdout.lock() {
            for event in events(r) {
                println!("{}", event.to_json());
            }
        }
    };

    let results = run_matrix(&recipe, &configs, &opts, &driver, report)?;

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    let failed: Vec<&MatrixResult> = results.iter().filter(|r| !r.is_success()).collect();
    if json {
        let summary = format!("{} configuration(s) built, {} failed", results.len(), failed.len());
        println!("{}", BuildEvent::note(summary).to_json());
    } else {
        for r in &failed {
            if let Err(err) = &r.result {
                eprintln!("{:?}", miette::Report::msg(format!("{}: {}", r.configuration, err)));
            }
        }
        eprintln!(
            "    Finished {} configuration(s), {} failed",
            results.len(),
            failed.len()
        );
    }

    if !failed.is_empty() {
        bail!("{} of {} configuration(s) failed", failed.len(), results.len());
    }
    Ok(())
}

fn events(r: &MatrixResult) -> Vec<BuildEvent> {
    let duration_ms = r.duration.as_millis() as u64;
    let mut events = Vec::new();
    match &r.result {
        Ok(outcome) => {
            events.extend(
                outcome
                    .files
                    .iter()
                    .map(|f| BuildEvent::artifact(&r.plan_id, f.path.clone(), f.sha256.clone())),
            );
            events.push(
                BuildEvent::finished(&r.plan_id, true, duration_ms).with_artifacts(outcome.files.len()),
            );
        }
        Err(err) => {
            events.push(BuildEvent::failure(&r.plan_id, err));
            events.push(BuildEvent::finished(&r.plan_id, false, duration_ms));
        }
    }
    events
}
