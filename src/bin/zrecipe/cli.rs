//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// zrecipe - deterministic build-variant orchestration for the zlib recipe
#[derive(Parser)]
#[command(name = "zrecipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a profile and print the build plan as JSON (no build)
    Plan(PlanArgs),

    /// Build and package one configuration
    Build(BuildArgs),

    /// Build several configurations in parallel
    Matrix(MatrixArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output format for build results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MessageFormat {
    #[default]
    Human,
    Json,
}

#[derive(Args)]
pub struct OverrideArgs {
    /// Override a setting (os, arch, build_type, compiler, compiler.version)
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Override an option (shared, fPIC, minizip)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Recipe manifest (default: ./Recipe.toml, else the built-in recipe)
    #[arg(long, env = "ZRECIPE_RECIPE")]
    pub recipe: Option<PathBuf>,
}

impl OverrideArgs {
    /// Settings first, then options, each in command-line order.
    pub fn overrides(&self) -> Vec<String> {
        self.settings.iter().chain(&self.options).cloned().collect()
    }
}

#[derive(Args)]
pub struct PlanArgs {
    /// Profile file
    #[arg(long, short = 'p')]
    pub profile: PathBuf,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Profile file
    #[arg(long, short = 'p')]
    pub profile: PathBuf,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Pristine upstream source tree
    #[arg(long)]
    pub source: PathBuf,

    /// Working directory (default: target/zrecipe/<plan id>)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Number of parallel backend jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct MatrixArgs {
    /// Profile files, one configuration each
    #[arg(long = "profile", short = 'p', required = true)]
    pub profiles: Vec<PathBuf>,

    /// Overrides applied to every profile
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Pristine upstream source tree
    #[arg(long)]
    pub source: PathBuf,

    /// Parent directory for per-configuration working directories
    #[arg(long, default_value = "target/zrecipe/matrix")]
    pub work_root: PathBuf,

    /// Number of configurations built concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
