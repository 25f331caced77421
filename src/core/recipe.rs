//! Recipe manifest (`Recipe.toml`).
//!
//! The recipe describes the upstream package being built: its name and
//! version, and the assets shipped alongside the recipe (patches, the CMake
//! finder script, the companion library's build file).

use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::config::ConfigError;

/// Recipe manifest file name.
pub const RECIPE_FILE: &str = "Recipe.toml";

/// A unified diff shipped with the recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    /// Diff file, relative to the assets directory
    pub file: PathBuf,

    /// Directory inside the source tree the diff paths are relative to
    #[serde(default)]
    pub base: PathBuf,

    /// Leading path components to strip from diff headers
    #[serde(default)]
    pub strip: usize,
}

/// Recipe manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,

    pub version: Version,

    /// Directory holding patches and auxiliary files. Relative paths are
    /// resolved against the directory containing the manifest.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Patches applied to the pristine source, in order
    #[serde(default)]
    pub patches: Vec<PatchSpec>,

    /// CMake finder script copied verbatim into the package
    #[serde(default = "default_finder_script")]
    pub finder_script: String,

    /// Build file for the companion library, placed into its source directory
    #[serde(default = "default_companion_cmakelists")]
    pub companion_cmakelists: String,
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_finder_script() -> String {
    "FindZLIB.cmake".to_string()
}

fn default_companion_cmakelists() -> String {
    "CMakeLists_minizip.txt".to_string()
}

impl Default for Recipe {
    fn default() -> Self {
        Recipe {
            name: "zlib".to_string(),
            version: Version::new(1, 2, 11),
            assets_dir: default_assets_dir(),
            patches: Vec::new(),
            finder_script: default_finder_script(),
            companion_cmakelists: default_companion_cmakelists(),
        }
    }
}

impl Recipe {
    /// Load a recipe manifest, resolving the assets directory next to it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut recipe: Recipe = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        if recipe.assets_dir.is_relative() {
            if let Some(parent) = path.parent() {
                recipe.assets_dir = parent.join(&recipe.assets_dir);
            }
        }

        Ok(recipe)
    }

    /// Absolute or working-directory-relative path to an asset.
    pub fn asset(&self, name: impl AsRef<Path>) -> PathBuf {
        self.assets_dir.join(name)
    }
}
