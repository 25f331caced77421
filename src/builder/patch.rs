//! Source edits: unified-diff patches and exact text substitutions.
//!
//! Both kinds of edit fail with [`RecipeError::SourceDrift`] when the text
//! they expect is not in the file. There is no fuzzy matching. A file is
//! only written once every edit planned for it has been applied in memory,
//! so a failing edit leaves its file exactly as it was.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::builder::errors::{IoResultExt, RecipeError};
use crate::builder::plan::{PatchOperation, TextSubstitution};

const DEV_NULL: &str = "/dev/null";

/// Apply substitutions under `root`, grouped by file in first-seen order.
///
/// Every occurrence of a rule's anchor is replaced in a single pass. A rule
/// whose anchor is absent aborts before its file is written.
pub fn apply_substitutions(root: &Path, rules: &[TextSubstitution]) -> Result<(), RecipeError> {
    let mut by_file: Vec<(&Path, Vec<&TextSubstitution>)> = Vec::new();
    for rule in rules {
        match by_file.iter_mut().find(|(file, _)| *file == rule.file.as_path()) {
            Some((_, group)) => group.push(rule),
            None => by_file.push((rule.file.as_path(), vec![rule])),
        }
    }

    for (file, group) in by_file {
        let path = root.join(file);
        let mut contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecipeError::drift(
                    file,
                    &group[0].search,
                    "file does not exist",
                ))
            }
            Err(e) => return Err(RecipeError::io(&path, e)),
        };

        for rule in group {
            if !contents.contains(&rule.search) {
                return Err(RecipeError::drift(
                    file,
                    &rule.search,
                    format!("expected text not found: `{}`", rule.search),
                ));
            }
            let count = contents.matches(&rule.search).count();
            contents = contents.replace(&rule.search, &rule.replace);
            tracing::debug!("substituted {} occurrence(s) in {}", count, file.display());
        }

        fs::write(&path, contents).at(&path)?;
    }

    Ok(())
}

/// Apply one patch operation. Returns the files it touched, relative to
/// `root`.
pub fn apply_patch(
    root: &Path,
    assets_dir: &Path,
    op: &PatchOperation,
) -> Result<Vec<PathBuf>, RecipeError> {
    let patch_path = assets_dir.join(&op.patch);
    let text = fs::read_to_string(&patch_path).at(&patch_path)?;
    let sections = split_sections(&text);

    if sections.is_empty() {
        return Err(RecipeError::drift(
            &op.patch,
            "",
            "patch contains no file sections",
        ));
    }

    let mut touched = Vec::new();
    for section in sections {
        let patch = diffy::Patch::from_str(&section).map_err(|e| {
            RecipeError::drift(&op.patch, "", format!("malformed patch: {}", e))
        })?;

        let original = patch.original().map(header_path);
        let modified = patch.modified().map(header_path);
        let creates = original.map_or(true, |p| p == DEV_NULL);
        let deletes = modified.map_or(false, |p| p == DEV_NULL);

        let header = if deletes { original } else { modified }.ok_or_else(|| {
            RecipeError::drift(&op.patch, "", "patch section has no file header")
        })?;
        let relative = op.base.join(strip_components(header, op.strip));
        let path = root.join(&relative);

        let current = if creates {
            if path.exists() {
                return Err(RecipeError::drift(
                    &relative,
                    "",
                    "patch creates a file that already exists",
                ));
            }
            String::new()
        } else {
            match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(RecipeError::drift(&relative, "", "patched file does not exist"))
                }
                Err(e) => return Err(RecipeError::io(&path, e)),
            }
        };

        let patched = diffy::apply(&current, &patch).map_err(|e| {
            RecipeError::drift(&relative, first_removed_line(&section), format!("patch does not apply: {}", e))
        })?;

        if deletes {
            fs::remove_file(&path).at(&path)?;
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).at(parent)?;
            }
            fs::write(&path, patched).at(&path)?;
        }

        tracing::debug!("patched {}", relative.display());
        touched.push(relative);
    }

    Ok(touched)
}

/// Split a multi-file unified diff into single-file sections, each starting
/// at its `---` header. Leading `diff`/`index` lines are dropped.
fn split_sections(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let is_header = |i: usize| {
        lines[i].starts_with("--- ")
            && lines.get(i + 1).is_some_and(|l| l.starts_with("+++ "))
            && lines.get(i + 2).is_some_and(|l| l.starts_with("@@"))
    };

    let starts: Vec<usize> = (0..lines.len()).filter(|&i| is_header(i)).collect();
    let mut sections = Vec::new();
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(lines.len());
        let mut body: Vec<&str> = lines[start..end].to_vec();
        // Trailing git metadata belongs to the next section
        while body
            .last()
            .is_some_and(|l| l.starts_with("diff ") || l.starts_with("index ") || l.starts_with("new file mode") || l.starts_with("deleted file mode"))
        {
            body.pop();
        }
        let mut section = body.concat();
        if !section.ends_with('\n') {
            section.push('\n');
        }
        sections.push(section);
    }
    sections
}

/// File name from a diff header, without any trailing timestamp.
fn header_path(header: &str) -> &str {
    header.split('\t').next().unwrap_or(header).trim_end()
}

fn strip_components(path: &str, strip: usize) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .skip(strip)
        .collect()
}

fn first_removed_line(section: &str) -> String {
    section
        .lines()
        .skip(2)
        .find(|l| l.starts_with('-') || l.starts_with(' '))
        .map(|l| l[1..].to_string())
        .unwrap_or_default()
}
