//! Generator backend: CMake configure, build and install.

use std::path::{Path, PathBuf};

use crate::builder::errors::{IoResultExt, RecipeError};
use crate::util::process::ProcessBuilder;

/// CMake invocation for one source/build directory pair.
#[derive(Debug, Clone)]
pub struct CMakeBuilder {
    cmake: PathBuf,
    source_dir: PathBuf,
    build_dir: PathBuf,
    generator: Option<String>,
    platform: Option<String>,
    defines: Vec<(String, String)>,
    install_prefix: Option<PathBuf>,
    targets: Vec<String>,
    jobs: Option<usize>,
}

impl CMakeBuilder {
    pub fn new(cmake: impl Into<PathBuf>, source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        CMakeBuilder {
            cmake: cmake.into(),
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            generator: None,
            platform: None,
            defines: Vec::new(),
            install_prefix: None,
            targets: Vec::new(),
            jobs: None,
        }
    }

    /// Generator name passed with `-G`.
    pub fn generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    /// Platform passed with `-A` (Visual Studio generators).
    pub fn platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    /// Add `-D` cache definitions.
    pub fn defines<'d>(mut self, defines: impl IntoIterator<Item = &'d (String, String)>) -> Self {
        self.defines.extend(defines.into_iter().cloned());
        self
    }

    pub fn install_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.install_prefix = Some(prefix.into());
        self
    }

    /// Specify targets to build.
    pub fn targets(mut self, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.targets.extend(targets.into_iter().map(|s| s.into()));
        self
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Build configuration for multi-config generators, taken from
    /// `CMAKE_BUILD_TYPE`.
    fn config_name(&self) -> &str {
        self.defines
            .iter()
            .find(|(k, _)| k == "CMAKE_BUILD_TYPE")
            .map(|(_, v)| v.as_str())
            .unwrap_or("Release")
    }

    /// Configure and build.
    pub fn build(&self) -> Result<(), RecipeError> {
        std::fs::create_dir_all(&self.build_dir).at(&self.build_dir)?;
        self.configure_command().exec_and_check()?;
        self.build_command().exec_and_check()?;
        Ok(())
    }

    /// Configure, build, then install into the install prefix.
    pub fn build_and_install(&self) -> Result<(), RecipeError> {
        self.build()?;
        self.install_command().exec_and_check()?;
        Ok(())
    }

    pub fn configure_command(&self) -> ProcessBuilder {
        tracing::info!("Configuring {}", self.source_dir.display());

        let mut cmd = ProcessBuilder::new(&self.cmake)
            .cwd(&self.build_dir)
            .arg("-S")
            .arg(&self.source_dir)
            .arg("-B")
            .arg(&self.build_dir);

        if let Some(generator) = &self.generator {
            cmd = cmd.arg("-G").arg(generator);
        }
        if let Some(platform) = &self.platform {
            cmd = cmd.arg("-A").arg(platform);
        }
        for (key, value) in &self.defines {
            cmd = cmd.arg(format!("-D{}={}", key, value));
        }
        if let Some(prefix) = &self.install_prefix {
            cmd = cmd.arg(format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()));
        }

        cmd
    }

    pub fn build_command(&self) -> ProcessBuilder {
        tracing::info!("Building {}", self.targets_label());

        let mut cmd = ProcessBuilder::new(&self.cmake)
            .cwd(&self.build_dir)
            .arg("--build")
            .arg(&self.build_dir)
            .arg("--config")
            .arg(self.config_name());

        cmd = match self.jobs {
            Some(jobs) => cmd.arg("--parallel").arg(jobs.to_string()),
            None => cmd.arg("--parallel"),
        };

        if !self.targets.is_empty() {
            cmd = cmd.arg("--target").args(&self.targets);
        }

        cmd
    }

    pub fn install_command(&self) -> ProcessBuilder {
        tracing::info!("Installing into {}", self.prefix_label());

        ProcessBuilder::new(&self.cmake)
            .cwd(&self.build_dir)
            .arg("--install")
            .arg(&self.build_dir)
            .arg("--config")
            .arg(self.config_name())
    }

    fn targets_label(&self) -> String {
        if self.targets.is_empty() {
            "all targets".to_string()
        } else {
            self.targets.join(", ")
        }
    }

    fn prefix_label(&self) -> String {
        self.install_prefix
            .as_deref()
            .map(Path::display)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "default prefix".to_string())
    }
}
