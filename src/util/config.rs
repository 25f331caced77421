//! Tool configuration for zrecipe.
//!
//! zrecipe reads two configuration file locations:
//! - Global: `~/.zrecipe/config.toml` - User-wide defaults
//! - Project: `.zrecipe/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Neither file affects
//! plan resolution; they only say where the build tools live and how hard
//! to drive them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::process::{find_cmake, find_make, find_sh};

/// zrecipe configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tool locations
    pub tools: ToolsConfig,

    /// Build settings
    pub build: BuildConfig,
}

/// Explicit tool paths. Unset entries are looked up in PATH.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to cmake
    pub cmake: Option<PathBuf>,

    /// Path to make (or gmake / mingw32-make)
    pub make: Option<PathBuf>,

    /// Shell used to run `configure`
    pub sh: Option<PathBuf>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel jobs passed to the backend (None = backend default)
    pub jobs: Option<usize>,

    /// CMake generator (`-G`), e.g. "Ninja"
    pub cmake_generator: Option<String>,
}

/// Resolved tool paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub cmake: Option<PathBuf>,
    pub make: Option<PathBuf>,
    pub sh: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.tools.cmake.is_some() {
            self.tools.cmake = other.tools.cmake;
        }
        if other.tools.make.is_some() {
            self.tools.make = other.tools.make;
        }
        if other.tools.sh.is_some() {
            self.tools.sh = other.tools.sh;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.cmake_generator.is_some() {
            self.build.cmake_generator = other.build.cmake_generator;
        }
    }

    /// Configured tool paths, falling back to PATH lookup.
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            cmake: self.tools.cmake.clone().or_else(find_cmake),
            make: self.tools.make.clone().or_else(find_make),
            sh: self.tools.sh.clone().or_else(find_sh),
        }
    }
}

/// Get the global zrecipe config directory (~/.zrecipe).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".zrecipe"))
}

/// Get the project config path (.zrecipe/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".zrecipe").join("config.toml")
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.zrecipe/config.toml)
/// 2. Global config (~/.zrecipe/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");
        std::fs::write(
            &global,
            "[tools]\ncmake = \"/opt/cmake/bin/cmake\"\n[build]\njobs = 2\n",
        )
        .unwrap();
        std::fs::write(&project, "[build]\njobs = 8\ncmake_generator = \"Ninja\"\n").unwrap();

        let config = load_config(Some(&global), &project);
        assert_eq!(config.tools.cmake, Some(PathBuf::from("/opt/cmake/bin/cmake")));
        assert_eq!(config.build.jobs, Some(8));
        assert_eq!(config.build.cmake_generator.as_deref(), Some("Ninja"));
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, &tmp.path().join("nope.toml"));
        assert!(config.tools.make.is_none());
        assert!(config.build.jobs.is_none());
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[build\njobs = ").unwrap();

        let config = Config::load_or_default(&path);
        assert!(config.build.jobs.is_none());
    }

    #[test]
    fn test_explicit_tool_path_wins() {
        let mut config = Config::default();
        config.tools.make = Some(PathBuf::from("/usr/local/bin/gmake"));
        assert_eq!(
            config.tool_paths().make,
            Some(PathBuf::from("/usr/local/bin/gmake"))
        );
    }
}
