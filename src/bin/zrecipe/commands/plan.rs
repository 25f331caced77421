//! `zrecipe plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use zrecipe::ops::{resolve_plan, PlanOptions};

pub fn execute(args: PlanArgs) -> Result<()> {
    let opts = PlanOptions {
        profile: args.profile,
        overrides: args.overrides.overrides(),
        recipe: args.overrides.recipe,
    };

    let (_, plan) = resolve_plan(&opts)?;
    println!("{}", plan.to_json());

    Ok(())
}
