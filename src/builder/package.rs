//! Package assembly: copy rules, renames, license, finder script,
//! meta-description and final verification.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::builder::errors::{IoResultExt, RecipeError};
use crate::builder::plan::{CopyRule, ExpectedArtifact, PackageInfo, RenameRule, LICENSE_FILE, PACKAGE_INFO_FILE};
use crate::util::fs::{find_by_name, glob_exists, relative_path, symlink};
use crate::util::hash::sha256_file;

/// A file in the finished package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedFile {
    /// Relative to the package directory
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Link target, for symlinks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<PathBuf>,
}

/// Run the packaging table. Returns destination paths relative to the
/// package directory, in copy order.
pub fn apply_copy_rules(
    workdir_root: &Path,
    package_dir: &Path,
    rules: &[CopyRule],
) -> Result<Vec<PathBuf>, RecipeError> {
    let mut copied = Vec::new();

    for rule in rules {
        let pattern = glob::Pattern::new(&rule.pattern)
            .map_err(|e| RecipeError::drift(&rule.src, &rule.pattern, e.to_string()))?;
        let src_root = workdir_root.join(&rule.src);
        let dst_dir = package_dir.join(&rule.dst);

        for file in find_by_name(&src_root, &pattern) {
            let Some(name) = file.file_name() else {
                continue;
            };
            fs::create_dir_all(&dst_dir).at(&dst_dir)?;
            let dst = dst_dir.join(name);

            let is_link = file.symlink_metadata().at(&file)?.file_type().is_symlink();
            if rule.symlinks && is_link {
                let target = fs::read_link(&file).at(&file)?;
                if dst.symlink_metadata().is_ok() {
                    fs::remove_file(&dst).at(&dst)?;
                }
                symlink(&target, &dst).at(&dst)?;
            } else {
                if dst.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink()) {
                    fs::remove_file(&dst).at(&dst)?;
                }
                fs::copy(&file, &dst).at(&file)?;
            }

            tracing::debug!(
                "copied {} -> {}",
                relative_path(workdir_root, &file).display(),
                relative_path(package_dir, &dst).display()
            );
            copied.push(rule.dst.join(name));
        }
    }

    Ok(copied)
}

/// Rename packaged libraries to their canonical names.
pub fn apply_renames(package_dir: &Path, renames: &[RenameRule]) -> Result<(), RecipeError> {
    for rename in renames {
        let from = package_dir.join(&rename.from);
        let to = package_dir.join(&rename.to);

        if from.symlink_metadata().is_err() {
            return Err(RecipeError::missing(
                rename.artifact.as_str(),
                rename.from.display().to_string(),
            ));
        }
        if to.symlink_metadata().is_ok() {
            fs::remove_file(&to).at(&to)?;
        }
        fs::rename(&from, &to).at(&from)?;
        tracing::debug!("renamed {} -> {}", rename.from.display(), rename.to.display());
    }
    Ok(())
}

/// Extract the license comment at the top of `header`.
///
/// The license is the text between offset 2 (past the opening `/*`) and
/// the first `*/`.
pub fn extract_license(header_text: &str) -> Option<&str> {
    let end = header_text.get(1..)?.find("*/")? + 1;
    header_text.get(2..end)
}

/// Write the license file into the package.
pub fn write_license(source_header: &Path, package_dir: &Path) -> Result<(), RecipeError> {
    let text = fs::read_to_string(source_header).at(source_header)?;
    let license = extract_license(&text).ok_or_else(|| {
        RecipeError::drift(source_header, "*/", "license comment is not terminated")
    })?;

    let dst = package_dir.join(LICENSE_FILE);
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(&dst, license).at(&dst)?;
    tracing::debug!("wrote {}", LICENSE_FILE);
    Ok(())
}

/// Copy the finder script verbatim into the package root.
pub fn copy_finder_script(assets_dir: &Path, name: &str, package_dir: &Path) -> Result<(), RecipeError> {
    let src = assets_dir.join(name);
    fs::create_dir_all(package_dir).at(package_dir)?;
    fs::copy(&src, package_dir.join(name)).at(&src)?;
    tracing::debug!("copied finder script {}", name);
    Ok(())
}

/// Write `package_info.json`.
pub fn write_package_info(package_dir: &Path, info: &PackageInfo) -> Result<(), RecipeError> {
    let dst = package_dir.join(PACKAGE_INFO_FILE);
    let json = serde_json::to_string_pretty(info)
        .map_err(|e| RecipeError::io(&dst, std::io::Error::other(e)))?;
    fs::create_dir_all(package_dir).at(package_dir)?;
    fs::write(&dst, json + "\n").at(&dst)?;
    tracing::debug!("wrote {}", PACKAGE_INFO_FILE);
    Ok(())
}

/// Check that every expected artifact is present.
pub fn verify_expected(package_dir: &Path, expected: &[ExpectedArtifact]) -> Result<(), RecipeError> {
    for artifact in expected {
        if !glob_exists(package_dir, &artifact.pattern) {
            return Err(RecipeError::missing(&artifact.kind, &artifact.pattern));
        }
    }
    Ok(())
}

/// Every file in the package, sorted by path.
pub fn list_package(package_dir: &Path) -> Result<Vec<PackagedFile>, RecipeError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(package_dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(package_dir).to_path_buf();
            RecipeError::io(path, std::io::Error::other(e))
        })?;
        if entry.file_type().is_dir() {
            continue;
        }

        let path = relative_path(package_dir, entry.path());
        if entry.path_is_symlink() {
            files.push(PackagedFile {
                path,
                sha256: None,
                link: Some(fs::read_link(entry.path()).at(entry.path())?),
            });
        } else {
            files.push(PackagedFile {
                path,
                sha256: Some(sha256_file(entry.path()).at(entry.path())?),
                link: None,
            });
        }
    }

    Ok(files)
}
