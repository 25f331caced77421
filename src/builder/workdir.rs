//! Isolated working directory for one configuration.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::builder::errors::{IoResultExt, RecipeError};
use crate::builder::plan::{BUILD_SUBFOLDER, PACKAGE_SUBFOLDER, SOURCE_SUBFOLDER};
use crate::core::recipe::Recipe;
use crate::util::fs::{copy_dir_all, make_executable, remove_dir_all_if_exists};

/// Working directory layout.
///
/// ```text
/// <root>/
///   source/          staged upstream sources
///     _build/        library build directory
///   package/         package output
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        WorkDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_SUBFOLDER)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.source_dir().join(BUILD_SUBFOLDER)
    }

    pub fn package_dir(&self) -> PathBuf {
        self.root.join(PACKAGE_SUBFOLDER)
    }

    /// Resolve a plan path (relative to the working directory).
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Stage a fresh copy of the pristine upstream tree.
    ///
    /// Anything left at `root` by a previous run is removed first.
    pub fn stage(root: impl Into<PathBuf>, pristine: &Path, recipe: &Recipe) -> Result<Self, RecipeError> {
        let workdir = WorkDir::new(root);
        tracing::info!(
            "Staging {} {} into {}",
            recipe.name,
            recipe.version,
            workdir.root.display()
        );

        if !pristine.join("zlib.h").is_file() {
            return Err(RecipeError::drift(
                pristine.join("zlib.h"),
                "",
                "pristine source tree has no zlib.h",
            ));
        }

        remove_dir_all_if_exists(&workdir.root).at(&workdir.root)?;
        let source = workdir.source_dir();
        copy_dir_all(pristine, &source).at(&source)?;

        let configure = source.join("configure");
        if configure.is_file() {
            make_executable(&configure).at(&configure)?;
        }

        check_upstream_version(&source, recipe)?;
        Ok(workdir)
    }
}

/// Verify that `zlib.h` declares the recipe's version.
fn check_upstream_version(source: &Path, recipe: &Recipe) -> Result<(), RecipeError> {
    let header = source.join("zlib.h");
    let text = fs::read_to_string(&header).at(&header)?;

    let anchor = "#define ZLIB_VERSION";
    let re = Regex::new(r#"(?m)^#define\s+ZLIB_VERSION\s+"([^"]+)""#)
        .map_err(|e| RecipeError::drift(&header, anchor, e.to_string()))?;

    let found = re
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| RecipeError::drift(&header, anchor, "version define not found"))?;

    let wanted = recipe.version.to_string();
    if found != wanted {
        return Err(RecipeError::drift(
            &header,
            anchor,
            format!("upstream declares version {}, recipe expects {}", found, wanted),
        ));
    }

    tracing::debug!("upstream version {} confirmed", found);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pristine_tree;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let workdir = WorkDir::new("/w");
        assert_eq!(workdir.source_dir(), PathBuf::from("/w/source"));
        assert_eq!(workdir.build_dir(), PathBuf::from("/w/source/_build"));
        assert_eq!(workdir.package_dir(), PathBuf::from("/w/package"));
    }

    #[test]
    fn test_stage_replaces_previous_tree() {
        let tmp = TempDir::new().unwrap();
        let pristine = pristine_tree(tmp.path());
        let root = tmp.path().join("work");
        std::fs::create_dir_all(root.join("package/lib")).unwrap();
        std::fs::write(root.join("package/lib/stale.a"), "old").unwrap();

        let workdir = WorkDir::stage(&root, &pristine, &Recipe::default()).unwrap();
        assert!(workdir.source_dir().join("zconf.h").is_file());
        assert!(!root.join("package/lib/stale.a").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_marks_configure_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let pristine = pristine_tree(tmp.path());
        let workdir = WorkDir::stage(tmp.path().join("work"), &pristine, &Recipe::default()).unwrap();

        let mode = std::fs::metadata(workdir.source_dir().join("configure"))
            .unwrap()
            .permissions()
            .mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_version_mismatch_is_drift() {
        let tmp = TempDir::new().unwrap();
        let pristine = pristine_tree(tmp.path());
        let recipe = Recipe {
            version: semver::Version::new(1, 3, 1),
            ..Recipe::default()
        };

        let err = WorkDir::stage(tmp.path().join("work"), &pristine, &recipe).unwrap_err();
        assert!(matches!(err, RecipeError::SourceDrift { .. }));
        assert!(err.to_string().contains("recipe expects 1.3.1"));
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = WorkDir::stage(
            tmp.path().join("work"),
            &tmp.path().join("nowhere"),
            &Recipe::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RecipeError::SourceDrift { .. }));
    }
}
