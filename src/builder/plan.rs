//! Build plan resolution.
//!
//! A [`BuildPlan`] is derived from a [`Configuration`] and a [`Recipe`] by
//! pure functions: no filesystem access, no environment lookups, no
//! timestamps. Resolving the same inputs twice yields byte-identical JSON,
//! which is what `zrecipe plan` prints for a dry run.
//!
//! All paths in a plan are relative. Source, build and package paths are
//! relative to the working directory; patch files and the companion build
//! file are relative to the recipe's assets directory.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::artifact::{ArtifactDescriptor, LibraryNaming, LogicalArtifact};
use crate::core::config::{Arch, BuildType, Configuration, LinkMode, Options, Platform, Settings};
use crate::core::recipe::Recipe;
use crate::util::hash::Fingerprint;

/// Pristine upstream sources, relative to the working directory.
pub const SOURCE_SUBFOLDER: &str = "source";
/// Library build directory, relative to the source directory.
pub const BUILD_SUBFOLDER: &str = "_build";
/// Package output, relative to the working directory.
pub const PACKAGE_SUBFOLDER: &str = "package";
/// Companion library sources, relative to the source directory.
pub const COMPANION_SUBFOLDER: &str = "contrib/minizip";
/// Generated meta-description, relative to the package directory.
pub const PACKAGE_INFO_FILE: &str = "package_info.json";
/// Extracted license text, relative to the package directory.
pub const LICENSE_FILE: &str = "licenses/LICENSE";

/// Build invocation mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// CMake: configure into a build directory, then build one target
    Generator,
    /// `configure` + `make` run directly against the host toolchain
    DirectToolchain,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Generator => "generator",
            Backend::DirectToolchain => "direct-toolchain",
        }
    }
}

/// Apply a unified diff from the recipe assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Diff file, relative to the assets directory
    pub patch: PathBuf,
    /// Directory the diff applies to, relative to the working directory
    pub base: PathBuf,
    /// Leading path components stripped from diff headers
    pub strip: usize,
}

/// Replace an exact anchor in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSubstitution {
    /// File to edit, relative to the working directory
    pub file: PathBuf,
    /// Exact text that must be present
    pub search: String,
    /// Text written in its place
    pub replace: String,
}

/// Build the compression library with the selected backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStep {
    pub backend: Backend,
    /// Backend target producing exactly the requested library
    pub target: String,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    /// `-D` definitions for the generator backend
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmake_defines: Vec<(String, String)>,
    /// CMake `-A` platform for multi-platform generators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_platform: Option<String>,
    /// Environment for `configure` and `make`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
}

/// Configure, build and install the companion library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionStep {
    /// Recipe asset placed as `CMakeLists.txt` in `source_dir`
    pub cmakelists: String,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    /// Install prefix, relative to the working directory
    pub install_prefix: PathBuf,
    pub cmake_defines: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_platform: Option<String>,
}

/// Copy files whose name matches `pattern` from anywhere below `src` into
/// `dst`, flattening directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    pub pattern: String,
    /// Relative to the working directory
    pub src: PathBuf,
    /// Relative to the package directory
    pub dst: PathBuf,
    /// Recreate symlinks instead of copying their targets
    #[serde(default)]
    pub symlinks: bool,
}

/// Rename a packaged file to its canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    pub artifact: LogicalArtifact,
    /// Relative to the package directory
    pub from: PathBuf,
    /// Relative to the package directory
    pub to: PathBuf,
}

/// A package file that must exist once execution finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedArtifact {
    /// What the file belongs to, for error messages
    pub kind: String,
    /// Glob relative to the package directory
    pub pattern: String,
}

/// Meta-description consumed by downstream build systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: Version,
    pub libs: Vec<String>,
    pub defines: Vec<String>,
    pub includedirs: Vec<String>,
    pub libdirs: Vec<String>,
    pub bindirs: Vec<String>,
    pub settings: Settings,
    pub options: Options,
}

/// A fully resolved build plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub recipe: String,
    pub version: Version,
    /// Normalized configuration the plan was resolved from
    pub configuration: Configuration,
    pub backend: Backend,
    pub patches: Vec<PatchOperation>,
    pub substitutions: Vec<TextSubstitution>,
    pub library: LibraryStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<CompanionStep>,
    pub copies: Vec<CopyRule>,
    pub renames: Vec<RenameRule>,
    /// Header the license comment is extracted from, relative to the
    /// working directory
    pub license_source: PathBuf,
    /// Recipe asset copied verbatim into the package root
    pub finder_script: String,
    pub expected: Vec<ExpectedArtifact>,
    pub package_info: PackageInfo,
}

/// Select the build backend.
///
/// Depends on the platform alone, so a cross build resolves the same way on
/// every host.
pub fn resolve_backend(config: &Configuration) -> Backend {
    match config.platform() {
        Platform::Linux => Backend::DirectToolchain,
        Platform::Macos | Platform::Windows | Platform::FreeBsd => Backend::Generator,
    }
}

/// Portability edits for the upstream sources, in application order.
pub fn plan_text_substitutions(config: &Configuration) -> Vec<TextSubstitution> {
    let source = PathBuf::from(SOURCE_SUBFOLDER);
    let mut rules = Vec::new();

    // Guards that `configure` would rewrite to `#if 1` must also hold when
    // the header is used by a generator build that never ran configure.
    for file in ["zconf.h", "zconf.h.cmakein", "zconf.h.in"] {
        for macro_name in ["HAVE_UNISTD_H", "HAVE_STDARG_H"] {
            rules.push(TextSubstitution {
                file: source.join(file),
                search: format!("#ifdef {}    /* may be set to #if 1 by ./configure */", macro_name),
                replace: format!(
                    "#if defined({0}) && (1-{0}-1 != 0)",
                    macro_name
                ),
            });
        }
    }

    if resolve_backend(config) == Backend::DirectToolchain {
        // https://github.com/madler/zlib/issues/268
        rules.push(TextSubstitution {
            file: source.join("gzguts.h"),
            search: "#if defined(_WIN32) || defined(__CYGWIN__)".to_string(),
            replace: "#if defined(_WIN32) || defined(__MINGW32__)".to_string(),
        });
        // configure hands CFLAGS to the shared-library link
        rules.push(TextSubstitution {
            file: source.join("configure"),
            search: "$LDSHARED $SFLAGS".to_string(),
            replace: "$LDSHARED $LDFLAGS".to_string(),
        });
        rules.push(TextSubstitution {
            file: source.join("Makefile.in"),
            search: "$(CC) $(CFLAGS) -o".to_string(),
            replace: "$(CC) $(LDFLAGS) -o".to_string(),
        });
    }

    rules
}

/// Backend target name for the library alone (no examples, no minigzip).
pub fn select_artifact_target(config: &Configuration, version: &Version) -> String {
    match (resolve_backend(config), config.link_mode()) {
        (Backend::Generator, LinkMode::Shared) => "zlib".to_string(),
        (Backend::Generator, LinkMode::Static) => "zlibstatic".to_string(),
        (Backend::DirectToolchain, LinkMode::Shared) => format!("libz.so.{}", version),
        (Backend::DirectToolchain, LinkMode::Static) => "libz.a".to_string(),
    }
}

/// Renames that bring packaged libraries to their canonical names.
pub fn plan_renames(config: &Configuration, version: &Version) -> Vec<RenameRule> {
    let lib = PathBuf::from("lib");
    let mut descriptors = vec![ArtifactDescriptor::library(config, version)];
    if config.options.minizip {
        descriptors.push(ArtifactDescriptor::companion(config));
    }

    descriptors
        .into_iter()
        .filter(|d| d.needs_rename())
        .map(|d| RenameRule {
            artifact: d.artifact,
            from: lib.join(&d.built),
            to: lib.join(&d.canonical),
        })
        .collect()
}

impl BuildPlan {
    /// Resolve the plan for one configuration.
    pub fn resolve(recipe: &Recipe, config: &Configuration) -> BuildPlan {
        let config = config.normalized();
        let version = &recipe.version;
        let backend = resolve_backend(&config);

        let source_dir = PathBuf::from(SOURCE_SUBFOLDER);
        let build_dir = source_dir.join(BUILD_SUBFOLDER);

        let patches = recipe
            .patches
            .iter()
            .map(|spec| PatchOperation {
                patch: spec.file.clone(),
                base: source_dir.join(&spec.base),
                strip: spec.strip,
            })
            .collect();

        let library = LibraryStep {
            backend,
            target: select_artifact_target(&config, version),
            source_dir: source_dir.clone(),
            build_dir: build_dir.clone(),
            cmake_defines: match backend {
                Backend::Generator => generator_defines(&config),
                Backend::DirectToolchain => Vec::new(),
            },
            generator_platform: match backend {
                Backend::Generator => generator_platform(&config),
                Backend::DirectToolchain => None,
            },
            env: match backend {
                Backend::Generator => Vec::new(),
                Backend::DirectToolchain => toolchain_env(&config),
            },
        };

        let companion = config.options.minizip.then(|| {
            let companion_dir = source_dir.join(COMPANION_SUBFOLDER);
            let mut cmake_defines = generator_defines(&config);
            cmake_defines.push((
                "BUILD_SHARED_LIBS".to_string(),
                on_off(config.options.shared).to_string(),
            ));
            CompanionStep {
                cmakelists: recipe.companion_cmakelists.clone(),
                build_dir: companion_dir.join(BUILD_SUBFOLDER),
                source_dir: companion_dir,
                install_prefix: PathBuf::from(PACKAGE_SUBFOLDER),
                cmake_defines,
                generator_platform: generator_platform(&config),
            }
        });

        let library_descriptor = ArtifactDescriptor::library(&config, version);
        let mut expected = vec![
            expect_file("license", LICENSE_FILE),
            expect_file("finder script", &recipe.finder_script),
            expect_file("package info", PACKAGE_INFO_FILE),
        ];
        expected.extend(
            library_descriptor
                .expected_patterns()
                .into_iter()
                .map(|p| expect_file(LogicalArtifact::Library.as_str(), &p)),
        );
        if config.options.minizip {
            expected.extend(
                ArtifactDescriptor::companion(&config)
                    .expected_patterns()
                    .into_iter()
                    .map(|p| expect_file(LogicalArtifact::Companion.as_str(), &p)),
            );
        }

        BuildPlan {
            recipe: recipe.name.clone(),
            version: version.clone(),
            backend,
            patches,
            substitutions: plan_text_substitutions(&config),
            library,
            companion,
            copies: copy_rules(&config, &source_dir, &build_dir),
            renames: plan_renames(&config, version),
            license_source: source_dir.join("zlib.h"),
            finder_script: recipe.finder_script.clone(),
            expected,
            package_info: package_info(recipe, &config, &library_descriptor),
            configuration: config,
        }
    }

    /// Pretty JSON rendering of the plan.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .expect("build plans hold only plain values and string keys")
    }

    /// Short content hash identifying this plan.
    pub fn id(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.to_json());
        fp.finish_short()
    }
}

fn expect_file(kind: &str, pattern: &str) -> ExpectedArtifact {
    ExpectedArtifact {
        kind: kind.to_string(),
        pattern: pattern.to_string(),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

fn generator_defines(config: &Configuration) -> Vec<(String, String)> {
    let mut defines = vec![(
        "CMAKE_BUILD_TYPE".to_string(),
        config.build_type().as_str().to_string(),
    )];

    if let Some(fpic) = config.options.fpic {
        defines.push((
            "CMAKE_POSITION_INDEPENDENT_CODE".to_string(),
            on_off(fpic).to_string(),
        ));
    }

    if config.platform().is_apple() {
        let arch = match config.arch() {
            Arch::Armv8 => "arm64",
            Arch::X86 => "i386",
            other => other.as_str(),
        };
        defines.push(("CMAKE_OSX_ARCHITECTURES".to_string(), arch.to_string()));
    }

    defines
}

fn generator_platform(config: &Configuration) -> Option<String> {
    if config.platform() != Platform::Windows
        || LibraryNaming::for_config(config) != LibraryNaming::Msvc
    {
        return None;
    }
    let platform = match config.arch() {
        Arch::X86 => "Win32",
        Arch::X86_64 => "x64",
        Arch::Armv7 => "ARM",
        Arch::Armv8 => "ARM64",
    };
    Some(platform.to_string())
}

fn toolchain_env(config: &Configuration) -> Vec<(String, String)> {
    let arch_flag = match config.arch() {
        Arch::X86 => Some("-m32"),
        Arch::X86_64 => Some("-m64"),
        Arch::Armv7 | Arch::Armv8 => None,
    };

    let mut cflags: Vec<&str> = arch_flag.into_iter().collect();
    if config.options.fpic == Some(true) {
        cflags.push("-fPIC");
    }
    match config.build_type() {
        BuildType::Debug => cflags.push("-g"),
        BuildType::Release => cflags.extend(["-O3", "-DNDEBUG"]),
    }

    let ldflags: Vec<&str> = arch_flag.into_iter().collect();

    vec![
        ("CFLAGS".to_string(), cflags.join(" ")),
        ("LDFLAGS".to_string(), ldflags.join(" ")),
    ]
}

fn copy_rules(config: &Configuration, source_dir: &Path, build_dir: &Path) -> Vec<CopyRule> {
    let rule = |pattern: &str, src: &Path, dst: &str, symlinks: bool| CopyRule {
        pattern: pattern.to_string(),
        src: src.to_path_buf(),
        dst: PathBuf::from(dst),
        symlinks,
    };

    let mut rules = Vec::new();
    for header in ["*zlib.h", "*zconf.h"] {
        rules.push(rule(header, source_dir, "include", false));
        rules.push(rule(header, build_dir, "include", false));
    }

    match config.link_mode() {
        LinkMode::Shared => {
            rules.push(rule("*.dylib*", build_dir, "lib", true));
            rules.push(rule("*.so*", build_dir, "lib", true));
            rules.push(rule("*.dll", build_dir, "bin", false));
            rules.push(rule("*.dll.a", build_dir, "lib", false));
        }
        LinkMode::Static => rules.push(rule("*.a", build_dir, "lib", false)),
    }
    rules.push(rule("*.lib", build_dir, "lib", false));
    rules.push(rule("*.pc", build_dir, "lib/pkgconfig", false));

    rules
}

fn package_info(recipe: &Recipe, config: &Configuration, library: &ArtifactDescriptor) -> PackageInfo {
    let mut libs = Vec::new();
    let mut defines = Vec::new();
    if config.options.minizip {
        libs.push("minizip".to_string());
        if config.options.shared {
            defines.push("MINIZIP_DLL".to_string());
        }
    }
    libs.push(library.link_name.clone());

    PackageInfo {
        name: recipe.name.clone(),
        version: recipe.version.clone(),
        libs,
        defines,
        includedirs: vec!["include".to_string()],
        libdirs: vec!["lib".to_string()],
        bindirs: vec!["bin".to_string()],
        settings: config.settings.clone(),
        options: config.options.clone(),
    }
}
