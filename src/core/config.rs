//! Build configuration: the settings matrix a plan is resolved from.
//!
//! A [`Configuration`] is the immutable input to plan resolution. It is
//! usually loaded from a profile file:
//!
//! ```toml
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//! build_type = "Release"
//!
//! [settings.compiler]
//! name = "gcc"
//! version = "11"
//!
//! [options]
//! shared = false
//! fPIC = true
//! minizip = true
//! ```
//!
//! and then adjusted with `key=value` overrides from the command line.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error while loading or adjusting a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for `{key}` (expected one of: {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("unknown setting `{key}` (expected one of: {expected})")]
    UnknownKey { key: String, expected: &'static str },

    #[error("malformed override `{0}` (expected `key=value`)")]
    MalformedOverride(String),

    #[error("failed to read `{path}`")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

const OVERRIDE_KEYS: &str = "os, arch, build_type, compiler, compiler.version, shared, fPIC, minizip";

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
    FreeBsd,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Linux,
        Platform::Macos,
        Platform::Windows,
        Platform::FreeBsd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::Macos => "Macos",
            Platform::Windows => "Windows",
            Platform::FreeBsd => "FreeBSD",
        }
    }

    /// Whether this platform follows Apple's dylib naming.
    pub fn is_apple(&self) -> bool {
        matches!(self, Platform::Macos)
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" => Ok(Platform::Macos),
            "windows" => Ok(Platform::Windows),
            "freebsd" => Ok(Platform::FreeBsd),
            _ => Err(ConfigError::InvalidValue {
                key: "os".to_string(),
                value: s.to_string(),
                expected: "Linux, Macos, Windows, FreeBSD",
            }),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
}

impl Arch {
    pub const ALL: [Arch; 4] = [Arch::X86, Arch::X86_64, Arch::Armv7, Arch::Armv8];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv7 => "armv7",
            Arch::Armv8 => "armv8",
        }
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i686" => Ok(Arch::X86),
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            "armv7" => Ok(Arch::Armv7),
            "armv8" | "aarch64" | "arm64" => Ok(Arch::Armv8),
            _ => Err(ConfigError::InvalidValue {
                key: "arch".to_string(),
                value: s.to_string(),
                expected: "x86, x86_64, armv7, armv8",
            }),
        }
    }
}

/// Build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BuildType {
    Debug,
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, BuildType::Debug)
    }
}

impl FromStr for BuildType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            _ => Err(ConfigError::InvalidValue {
                key: "build_type".to_string(),
                value: s.to_string(),
                expected: "Debug, Release",
            }),
        }
    }
}

/// Compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompilerFamily {
    Gcc,
    Clang,
    AppleClang,
    /// Microsoft Visual C++ ("Visual Studio")
    Msvc,
}

impl CompilerFamily {
    pub const ALL: [CompilerFamily; 4] = [
        CompilerFamily::Gcc,
        CompilerFamily::Clang,
        CompilerFamily::AppleClang,
        CompilerFamily::Msvc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Msvc => "msvc",
        }
    }

    /// Whether the toolchain names libraries `name.lib` rather than `libname.a`.
    pub fn uses_msvc_naming(&self) -> bool {
        matches!(self, CompilerFamily::Msvc)
    }
}

impl FromStr for CompilerFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gcc" => Ok(CompilerFamily::Gcc),
            "clang" => Ok(CompilerFamily::Clang),
            "apple-clang" | "apple_clang" | "apple clang" => Ok(CompilerFamily::AppleClang),
            "msvc" | "visual studio" | "visual_studio" => Ok(CompilerFamily::Msvc),
            _ => Err(ConfigError::InvalidValue {
                key: "compiler".to_string(),
                value: s.to_string(),
                expected: "gcc, clang, apple-clang, msvc (\"Visual Studio\")",
            }),
        }
    }
}

/// Compiler identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerIdentity {
    /// Compiler family (gcc, clang, msvc)
    #[serde(rename = "name")]
    pub family: CompilerFamily,
    /// Compiler version as reported by the host package manager
    pub version: String,
}

impl CompilerIdentity {
    pub fn new(family: CompilerFamily, version: impl Into<String>) -> Self {
        CompilerIdentity {
            family,
            version: version.into(),
        }
    }
}

impl fmt::Display for CompilerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.family.as_str(), self.version)
    }
}

/// Static or shared library production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    Static,
    Shared,
}

/// Recipe options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Options {
    /// Produce a shared library instead of a static archive
    #[serde(default)]
    pub shared: bool,

    /// Position-independent code; does not exist on Windows
    #[serde(rename = "fPIC", default = "default_fpic", skip_serializing_if = "Option::is_none")]
    pub fpic: Option<bool>,

    /// Also build and package the minizip companion library
    #[serde(default)]
    pub minizip: bool,
}

fn default_fpic() -> Option<bool> {
    Some(true)
}

impl Default for Options {
    fn default() -> Self {
        Options {
            shared: false,
            fpic: default_fpic(),
            minizip: false,
        }
    }
}

/// Settings half of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    pub os: Platform,
    pub arch: Arch,
    pub build_type: BuildType,
    pub compiler: CompilerIdentity,
}

/// A complete build configuration.
///
/// Resolution only ever borrows a configuration; nothing downstream of
/// [`crate::builder::BuildPlan::resolve`] mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    pub settings: Settings,
    #[serde(default)]
    pub options: Options,
}

impl Configuration {
    pub fn new(
        os: Platform,
        arch: Arch,
        compiler: CompilerIdentity,
        build_type: BuildType,
        options: Options,
    ) -> Self {
        Configuration {
            settings: Settings {
                os,
                arch,
                build_type,
                compiler,
            },
            options,
        }
    }

    /// Load a configuration from a profile file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Parse a profile from its TOML text. `origin` is only used in errors.
    pub fn parse(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn platform(&self) -> Platform {
        self.settings.os
    }

    pub fn arch(&self) -> Arch {
        self.settings.arch
    }

    pub fn build_type(&self) -> BuildType {
        self.settings.build_type
    }

    pub fn compiler(&self) -> &CompilerIdentity {
        &self.settings.compiler
    }

    pub fn link_mode(&self) -> LinkMode {
        if self.options.shared {
            LinkMode::Shared
        } else {
            LinkMode::Static
        }
    }

    /// Drop options that do not exist for this platform.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if config.settings.os == Platform::Windows {
            config.options.fpic = None;
        }
        config
    }

    /// Apply a single `key=value` setting or option override.
    pub fn apply_override(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, value) = assignment
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or_else(|| ConfigError::MalformedOverride(assignment.to_string()))?;

        match key {
            "os" => self.settings.os = value.parse()?,
            "arch" => self.settings.arch = value.parse()?,
            "build_type" => self.settings.build_type = value.parse()?,
            "compiler" => self.settings.compiler.family = value.parse()?,
            "compiler.version" => self.settings.compiler.version = value.to_string(),
            "shared" => self.options.shared = parse_bool(key, value)?,
            "fPIC" => self.options.fpic = Some(parse_bool(key, value)?),
            "minizip" => self.options.minizip = parse_bool(key, value)?,
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                    expected: OVERRIDE_KEYS,
                })
            }
        }
        Ok(())
    }

    /// Short human-readable label, e.g. `Linux-x86_64-gcc-11-Release-static`.
    pub fn label(&self) -> String {
        let mut label = format!(
            "{}-{}-{}-{}-{}",
            self.settings.os.as_str(),
            self.settings.arch.as_str(),
            self.settings.compiler,
            self.settings.build_type.as_str(),
            if self.options.shared { "shared" } else { "static" }
        );
        if self.options.minizip {
            label.push_str("-minizip");
        }
        label
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "True, False",
        }),
    }
}

macro_rules! string_conversions {
    ($($ty:ty),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

string_conversions!(Platform, Arch, BuildType, CompilerFamily);
