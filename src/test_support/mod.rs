//! Test utilities for zrecipe unit tests.
//!
//! [`FakeDriver`] stands in for cmake and make: it records every step it is
//! asked to run and writes the files a real backend would produce for the
//! plan's configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! let tmp = TempDir::new().unwrap();
//! let pristine = pristine_tree(tmp.path());
//! let recipe = recipe_with_assets(tmp.path());
//! let plan = BuildPlan::resolve(&recipe, &config);
//! let driver = FakeDriver::for_plan(&plan);
//! ```

pub mod fixtures;

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::builder::driver::BuildDriver;
use crate::builder::errors::RecipeError;
use crate::builder::plan::{Backend, BuildPlan, CompanionStep, LibraryStep};
use crate::builder::workdir::WorkDir;
use crate::core::artifact::ArtifactDescriptor;

pub use fixtures::*;

/// Recording backend driver.
#[derive(Debug, Default)]
pub struct FakeDriver {
    /// Files written into the library build directory
    library_outputs: Vec<PathBuf>,
    /// Files written under the companion install prefix
    companion_outputs: Vec<PathBuf>,
    /// Exit code and stderr for a failing library build
    library_failure: Option<(i32, String)>,
    calls: Mutex<Vec<String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce exactly what a real backend would for this plan.
    pub fn for_plan(plan: &BuildPlan) -> Self {
        let config = &plan.configuration;
        let library = ArtifactDescriptor::library(config, &plan.version);

        let mut library_outputs = vec![PathBuf::from(&library.built)];
        if let Some(runtime) = &library.runtime {
            let dll = runtime
                .trim_start_matches("bin/")
                .replacen("*zlib", "libzlib", 1)
                .replace('*', "1");
            library_outputs.push(PathBuf::from(dll));
        }
        if plan.backend == Backend::DirectToolchain {
            library_outputs.push(PathBuf::from("zconf.h"));
            library_outputs.push(PathBuf::from("zlib.pc"));
        }

        let mut companion_outputs = Vec::new();
        if config.options.minizip {
            let companion = ArtifactDescriptor::companion(config);
            companion_outputs.push(PathBuf::from("lib").join(&companion.built));
            companion_outputs.extend(companion.runtime.iter().map(PathBuf::from));
            companion_outputs.extend(companion.headers.iter().map(PathBuf::from));
        }

        FakeDriver {
            library_outputs,
            companion_outputs,
            ..Self::default()
        }
    }

    /// Make the library build succeed without producing anything.
    pub fn without_outputs(mut self) -> Self {
        self.library_outputs.clear();
        self.companion_outputs.clear();
        self
    }

    /// Make the library build fail with the given exit code and stderr.
    pub fn failing(mut self, code: i32, stderr: impl Into<String>) -> Self {
        self.library_failure = Some((code, stderr.into()));
        self
    }

    /// Steps invoked so far, e.g. `library libz.a`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl BuildDriver for FakeDriver {
    fn build_library(&self, step: &LibraryStep, workdir: &WorkDir) -> Result<(), RecipeError> {
        self.record(format!("library {}", step.target));

        if let Some((code, stderr)) = &self.library_failure {
            return Err(RecipeError::BackendInvocation {
                command: format!("fake-build {}", step.target),
                code: Some(*code),
                stderr: stderr.clone(),
            });
        }

        let build_dir = workdir.resolve(&step.build_dir);
        for output in &self.library_outputs {
            let path = build_dir.join(output);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("fake {}", output.display())).unwrap();
        }
        Ok(())
    }

    fn build_companion(&self, step: &CompanionStep, workdir: &WorkDir) -> Result<(), RecipeError> {
        self.record(format!("companion {}", step.source_dir.display()));

        assert!(
            workdir.resolve(&step.source_dir).join("CMakeLists.txt").is_file(),
            "companion build file must be in place before the build"
        );

        let prefix = workdir.resolve(&step.install_prefix);
        for output in &self.companion_outputs {
            let path = prefix.join(output);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("fake {}", output.display())).unwrap();
        }
        Ok(())
    }
}
