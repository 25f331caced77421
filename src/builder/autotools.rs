//! Direct-toolchain backend: `configure` then `make <target>`.

use std::path::PathBuf;

use crate::builder::errors::{IoResultExt, RecipeError};
use crate::util::process::ProcessBuilder;

/// Out-of-tree `configure` + `make` run.
#[derive(Debug, Clone)]
pub struct AutotoolsBuilder {
    sh: PathBuf,
    make: PathBuf,
    source_dir: PathBuf,
    build_dir: PathBuf,
    env: Vec<(String, String)>,
    target: Option<String>,
    jobs: Option<usize>,
}

impl AutotoolsBuilder {
    pub fn new(
        sh: impl Into<PathBuf>,
        make: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
    ) -> Self {
        AutotoolsBuilder {
            sh: sh.into(),
            make: make.into(),
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            env: Vec::new(),
            target: None,
            jobs: None,
        }
    }

    /// Environment for both `configure` and `make`.
    pub fn env<'e>(mut self, env: impl IntoIterator<Item = &'e (String, String)>) -> Self {
        self.env.extend(env.into_iter().cloned());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn build(&self) -> Result<(), RecipeError> {
        std::fs::create_dir_all(&self.build_dir).at(&self.build_dir)?;
        self.configure_command().exec_and_check()?;
        self.make_command().exec_and_check()?;
        Ok(())
    }

    pub fn configure_command(&self) -> ProcessBuilder {
        tracing::info!("Running configure in {}", self.build_dir.display());

        let cmd = ProcessBuilder::new(&self.sh)
            .cwd(&self.build_dir)
            .arg(self.source_dir.join("configure"));
        self.with_env(cmd)
    }

    pub fn make_command(&self) -> ProcessBuilder {
        tracing::info!(
            "Running make {}",
            self.target.as_deref().unwrap_or("(default target)")
        );

        let mut cmd = ProcessBuilder::new(&self.make).cwd(&self.build_dir);
        if let Some(jobs) = self.jobs {
            cmd = cmd.arg(format!("-j{}", jobs));
        }
        if let Some(target) = &self.target {
            cmd = cmd.arg(target);
        }
        self.with_env(cmd)
    }

    fn with_env(&self, mut cmd: ProcessBuilder) -> ProcessBuilder {
        for (key, value) in &self.env {
            cmd = cmd.env(key, value);
        }
        cmd
    }
}
