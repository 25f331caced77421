//! Backend seam.
//!
//! The executor never spawns tools itself; it hands each build step to a
//! [`BuildDriver`]. [`HostDriver`] runs the real tools. Tests substitute a
//! recording fake.

use std::path::PathBuf;

use crate::builder::autotools::AutotoolsBuilder;
use crate::builder::cmake::CMakeBuilder;
use crate::builder::errors::RecipeError;
use crate::builder::plan::{Backend, CompanionStep, LibraryStep};
use crate::builder::workdir::WorkDir;
use crate::util::config::{Config, ToolPaths};

/// Runs build steps against some backend.
pub trait BuildDriver: Send + Sync {
    /// Build the library target in `step.build_dir`.
    fn build_library(&self, step: &LibraryStep, workdir: &WorkDir) -> Result<(), RecipeError>;

    /// Configure, build and install the companion library. The build file
    /// is already in place when this is called.
    fn build_companion(&self, step: &CompanionStep, workdir: &WorkDir) -> Result<(), RecipeError>;
}

/// Driver that invokes the host's cmake, sh and make.
#[derive(Debug, Clone)]
pub struct HostDriver {
    tools: ToolPaths,
    jobs: Option<usize>,
    generator: Option<String>,
}

impl HostDriver {
    pub fn new(tools: ToolPaths) -> Self {
        HostDriver {
            tools,
            jobs: None,
            generator: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        HostDriver {
            tools: config.tool_paths(),
            jobs: config.build.jobs,
            generator: config.build.cmake_generator.clone(),
        }
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        if jobs.is_some() {
            self.jobs = jobs;
        }
        self
    }

    fn tool(path: &Option<PathBuf>, name: &str) -> Result<PathBuf, RecipeError> {
        path.clone().ok_or_else(|| RecipeError::BackendInvocation {
            command: name.to_string(),
            code: None,
            stderr: format!(
                "{0} not found in PATH; install it or set `[tools] {0}` in .zrecipe/config.toml",
                name
            ),
        })
    }
}

impl BuildDriver for HostDriver {
    fn build_library(&self, step: &LibraryStep, workdir: &WorkDir) -> Result<(), RecipeError> {
        let source_dir = workdir.resolve(&step.source_dir);
        let build_dir = workdir.resolve(&step.build_dir);

        match step.backend {
            Backend::Generator => {
                CMakeBuilder::new(Self::tool(&self.tools.cmake, "cmake")?, source_dir, build_dir)
                    .generator(self.generator.clone())
                    .platform(step.generator_platform.clone())
                    .defines(&step.cmake_defines)
                    .targets([step.target.as_str()])
                    .jobs(self.jobs)
                    .build()
            }
            Backend::DirectToolchain => AutotoolsBuilder::new(
                Self::tool(&self.tools.sh, "sh")?,
                Self::tool(&self.tools.make, "make")?,
                source_dir,
                build_dir,
            )
            .env(&step.env)
            .target(&step.target)
            .jobs(self.jobs)
            .build(),
        }
    }

    fn build_companion(&self, step: &CompanionStep, workdir: &WorkDir) -> Result<(), RecipeError> {
        CMakeBuilder::new(
            Self::tool(&self.tools.cmake, "cmake")?,
            workdir.resolve(&step.source_dir),
            workdir.resolve(&step.build_dir),
        )
        .generator(self.generator.clone())
        .platform(step.generator_platform.clone())
        .defines(&step.cmake_defines)
        .install_prefix(workdir.resolve(&step.install_prefix))
        .jobs(self.jobs)
        .build_and_install()
    }
}
