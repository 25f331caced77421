//! Build failure taxonomy.
//!
//! Every variant is fatal to the configuration being built. Nothing here is
//! retried and nothing is rolled back; the working directory is left as-is
//! for inspection.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// A fatal error while executing a build plan.
#[derive(Debug, Error, Diagnostic)]
pub enum RecipeError {
    /// The upstream source no longer contains text a patch or substitution
    /// expects to find.
    #[error("source drift in `{}`: {reason}", file.display())]
    #[diagnostic(
        code(zrecipe::source_drift),
        help("upstream sources changed; update the recipe's patches and substitutions")
    )]
    SourceDrift {
        file: PathBuf,
        anchor: String,
        reason: String,
    },

    /// The build backend reported failure. `stderr` is the tool's output,
    /// untouched.
    #[error("`{command}` failed with exit code {}\n{stderr}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    #[diagnostic(code(zrecipe::backend))]
    BackendInvocation {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A file the plan promised is absent after a successful backend run.
    #[error("expected {artifact} artifact `{pattern}` was not produced")]
    #[diagnostic(
        code(zrecipe::artifact_missing),
        help("the backend succeeded but did not produce this file; check the build log")
    )]
    ArtifactMissing { artifact: String, pattern: String },

    #[error("I/O error on `{}`", path.display())]
    #[diagnostic(code(zrecipe::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RecipeError {
    pub fn drift(file: impl Into<PathBuf>, anchor: impl Into<String>, reason: impl Into<String>) -> Self {
        RecipeError::SourceDrift {
            file: file.into(),
            anchor: anchor.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecipeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing(artifact: impl Into<String>, pattern: impl Into<String>) -> Self {
        RecipeError::ArtifactMissing {
            artifact: artifact.into(),
            pattern: pattern.into(),
        }
    }

    /// Short kind name used in JSON events.
    pub fn kind(&self) -> &'static str {
        match self {
            RecipeError::SourceDrift { .. } => "source-drift",
            RecipeError::BackendInvocation { .. } => "backend-invocation",
            RecipeError::ArtifactMissing { .. } => "artifact-missing",
            RecipeError::Io { .. } => "io",
        }
    }
}

/// Extension for attaching a path to `std::io::Result`.
pub trait IoResultExt<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, RecipeError>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, RecipeError> {
        self.map_err(|e| RecipeError::io(path, e))
    }
}
