//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

/// Recursively copy a directory, preserving symlinks on Unix.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else if ty.is_symlink() {
            symlink(&fs::read_link(&src_path)?, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// Files below `root` whose file name matches `pattern`, in sorted order.
///
/// Symlinks are reported but not followed.
pub fn find_by_name(root: &Path, pattern: &Pattern) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }

    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("walk error: {}", e);
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| pattern.matches(name))
        })
        .map(|entry| entry.into_path())
        .collect();

    found.sort();
    found
}

/// Whether any file below `root` matches a relative glob like `lib/*.dll`.
pub fn glob_exists(root: &Path, relative_pattern: &str) -> bool {
    let full = root.join(relative_pattern);
    glob::glob(&full.to_string_lossy())
        .map(|mut paths| paths.any(|p| p.is_ok_and(|p| p.symlink_metadata().is_ok())))
        .unwrap_or(false)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Create a symlink (platform-aware).
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Mark a file executable. No-op off Unix.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
