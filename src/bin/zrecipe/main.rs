//! zrecipe CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zrecipe::RecipeError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        match e.downcast::<RecipeError>() {
            Ok(err) => eprintln!("{:?}", miette::Report::new(err)),
            Err(e) => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("zrecipe=debug")
    } else {
        EnvFilter::new("zrecipe=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Build(args) => commands::build::execute(args),
        Commands::Matrix(args) => commands::matrix::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
