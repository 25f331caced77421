//! Command implementations

pub mod build;
pub mod completions;
pub mod matrix;
pub mod plan;

use std::path::Path;

use zrecipe::util::config::{global_config_dir, load_config, project_config_path};
use zrecipe::util::Config;

/// Tool configuration for the current directory (global + project).
pub fn tool_config(cwd: &Path) -> Config {
    let global = global_config_dir().map(|dir| dir.join("config.toml"));
    load_config(global.as_deref(), &project_config_path(cwd))
}
