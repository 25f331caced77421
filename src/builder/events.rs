//! Build event types for JSON output.
//!
//! Emitted one object per line when running with `--message-format=json`.
//!
//! # Event Types
//!
//! - `plan-resolved`: a configuration was resolved to a plan
//! - `package-artifact`: a file is present in the finished package
//! - `build-finished`: a configuration finished (success or failure)
//! - `diagnostic`: a failure or notice attached to a configuration
//!
//! New fields may be added, but existing fields should not be removed or
//! renamed.

use std::path::PathBuf;

use serde::Serialize;

use crate::builder::errors::RecipeError;

/// A build event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    /// A configuration was resolved.
    #[serde(rename = "plan-resolved")]
    PlanResolved {
        /// Short plan id
        plan_id: String,
        /// Configuration label, e.g. "Linux-x86_64-gcc-11-Release-static"
        configuration: String,
        /// "generator" or "direct-toolchain"
        backend: String,
        /// Backend target name
        target: String,
    },

    /// A packaged file.
    #[serde(rename = "package-artifact")]
    PackageArtifact {
        plan_id: String,
        /// Path relative to the package directory
        path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },

    /// A configuration finished.
    #[serde(rename = "build-finished")]
    BuildFinished {
        plan_id: String,
        success: bool,
        /// Build duration in milliseconds
        duration_ms: u64,
        /// Number of files in the package
        #[serde(skip_serializing_if = "Option::is_none")]
        artifacts: Option<u64>,
    },

    /// A generic diagnostic message.
    #[serde(rename = "diagnostic")]
    Diagnostic {
        #[serde(skip_serializing_if = "Option::is_none")]
        plan_id: Option<String>,
        /// Severity level ("error", "warning", "note")
        level: String,
        /// Error kind, e.g. "source-drift"
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        message: String,
    },
}

impl BuildEvent {
    pub fn plan_resolved(
        plan_id: impl Into<String>,
        configuration: impl Into<String>,
        backend: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        BuildEvent::PlanResolved {
            plan_id: plan_id.into(),
            configuration: configuration.into(),
            backend: backend.into(),
            target: target.into(),
        }
    }

    pub fn artifact(plan_id: impl Into<String>, path: PathBuf, sha256: Option<String>) -> Self {
        BuildEvent::PackageArtifact {
            plan_id: plan_id.into(),
            path,
            sha256,
        }
    }

    /// Create a build finished event.
    pub fn finished(plan_id: impl Into<String>, success: bool, duration_ms: u64) -> Self {
        BuildEvent::BuildFinished {
            plan_id: plan_id.into(),
            success,
            duration_ms,
            artifacts: None,
        }
    }

    /// Attach the number of packaged files to a finished event.
    pub fn with_artifacts(self, count: usize) -> Self {
        match self {
            BuildEvent::BuildFinished {
                plan_id,
                success,
                duration_ms,
                ..
            } => BuildEvent::BuildFinished {
                plan_id,
                success,
                duration_ms,
                artifacts: Some(count as u64),
            },
            other => other,
        }
    }

    /// Error diagnostic for a failed build.
    pub fn failure(plan_id: impl Into<String>, err: &RecipeError) -> Self {
        BuildEvent::Diagnostic {
            plan_id: Some(plan_id.into()),
            level: "error".to_string(),
            kind: Some(err.kind().to_string()),
            message: err.to_string(),
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        BuildEvent::Diagnostic {
            plan_id: None,
            level: "note".to_string(),
            kind: None,
            message: message.into(),
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
