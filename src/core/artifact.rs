//! Artifact descriptors.
//!
//! Maps a logical artifact (the compression library, the companion utility)
//! to the physical file names a given platform, compiler and link mode
//! produce, and to the canonical name the package guarantees.

use serde::{Deserialize, Serialize};

use crate::core::config::{Configuration, LinkMode, Platform};

/// Logical artifacts a package can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalArtifact {
    /// The compression library itself
    Library,
    /// The minizip companion utility library
    Companion,
}

impl LogicalArtifact {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalArtifact::Library => "zlib",
            LogicalArtifact::Companion => "minizip",
        }
    }
}

/// How a toolchain names library files on Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryNaming {
    /// `name.lib`, with a `d` postfix for debug builds
    Msvc,
    /// `libname.a` / `libname.dll.a`
    Gnu,
}

impl LibraryNaming {
    pub fn for_config(config: &Configuration) -> Self {
        if config.compiler().family.uses_msvc_naming() {
            LibraryNaming::Msvc
        } else {
            LibraryNaming::Gnu
        }
    }
}

/// Physical file names for one logical artifact under one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub artifact: LogicalArtifact,

    /// Name consumers pass to the linker (`-l<name>` or `<name>.lib`)
    pub link_name: String,

    /// Library file name as the backend produces it
    pub built: String,

    /// Library file name guaranteed in the package `lib/` directory
    pub canonical: String,

    /// Runtime library glob under `bin/`, for DLL platforms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    /// Header paths relative to the package root
    pub headers: Vec<String>,
}

impl ArtifactDescriptor {
    /// Descriptor for the compression library.
    pub fn library(config: &Configuration, version: &semver::Version) -> Self {
        let link = config.link_mode();
        let headers = vec!["include/zlib.h".to_string(), "include/zconf.h".to_string()];

        let (link_name, built, canonical, runtime) = match config.platform() {
            Platform::Windows => {
                let (built, canonical, runtime) = match (LibraryNaming::for_config(config), link) {
                    (LibraryNaming::Msvc, LinkMode::Shared) => (
                        format!("zlib{}.lib", debug_postfix(config)),
                        "zlib.lib",
                        Some("bin/zlib*.dll"),
                    ),
                    (LibraryNaming::Msvc, LinkMode::Static) => (
                        format!("zlibstatic{}.lib", debug_postfix(config)),
                        "zlib.lib",
                        None,
                    ),
                    (LibraryNaming::Gnu, LinkMode::Shared) => (
                        "libzlib.dll.a".to_string(),
                        "libzlib.dll.a",
                        Some("bin/*zlib*.dll"),
                    ),
                    (LibraryNaming::Gnu, LinkMode::Static) => {
                        ("libzlibstatic.a".to_string(), "libzlib.a", None)
                    }
                };
                ("zlib", built, canonical.to_string(), runtime.map(str::to_string))
            }
            platform => {
                let file = match link {
                    LinkMode::Static => "libz.a".to_string(),
                    LinkMode::Shared if platform.is_apple() => format!("libz.{}.dylib", version),
                    LinkMode::Shared => format!("libz.so.{}", version),
                };
                ("z", file.clone(), file, None)
            }
        };

        ArtifactDescriptor {
            artifact: LogicalArtifact::Library,
            link_name: link_name.to_string(),
            built,
            canonical,
            runtime,
            headers,
        }
    }

    /// Descriptor for the minizip companion library.
    ///
    /// Only `include/minizip/zip.h` is listed in `headers`: it is the one
    /// header verification requires. The shipped `CMakeLists_minizip.txt`
    /// installs the full public set (`crypt.h`, `ioapi.h`, `mztools.h`,
    /// `unzip.h`, `zip.h`, plus `iowin32.h` on Windows), and test fakes that build from
    /// this descriptor install `zip.h` alone.
    pub fn companion(config: &Configuration) -> Self {
        let link = config.link_mode();

        let (file, runtime) = match (config.platform(), LibraryNaming::for_config(config), link) {
            (Platform::Windows, LibraryNaming::Msvc, LinkMode::Shared) => {
                ("minizip.lib", Some("bin/minizip.dll"))
            }
            (Platform::Windows, LibraryNaming::Msvc, LinkMode::Static) => ("minizip.lib", None),
            (Platform::Windows, LibraryNaming::Gnu, LinkMode::Shared) => {
                ("libminizip.dll.a", Some("bin/libminizip.dll"))
            }
            (_, _, LinkMode::Static) => ("libminizip.a", None),
            (Platform::Macos, _, LinkMode::Shared) => ("libminizip.dylib", None),
            (_, _, LinkMode::Shared) => ("libminizip.so", None),
        };

        ArtifactDescriptor {
            artifact: LogicalArtifact::Companion,
            link_name: "minizip".to_string(),
            built: file.to_string(),
            canonical: file.to_string(),
            runtime: runtime.map(str::to_string),
            headers: vec!["include/minizip/zip.h".to_string()],
        }
    }

    /// Whether the produced file must be renamed to reach the canonical name.
    pub fn needs_rename(&self) -> bool {
        self.built != self.canonical
    }

    /// Package-relative globs that must each match at least one file.
    pub fn expected_patterns(&self) -> Vec<String> {
        let mut patterns = vec![format!("lib/{}", self.canonical)];
        patterns.extend(self.runtime.iter().cloned());
        patterns.extend(self.headers.iter().cloned());
        patterns
    }
}

fn debug_postfix(config: &Configuration) -> &'static str {
    if config.build_type().is_debug() {
        "d"
    } else {
        ""
    }
}
