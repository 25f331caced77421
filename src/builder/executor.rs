//! Plan execution.
//!
//! Steps run in a fixed order and stop at the first failure:
//!
//! 0. every recipe asset the plan names must exist
//! 1. patches
//! 2. text substitutions
//! 3. library build
//! 4. companion build, when planned
//! 5. packaging copy rules
//! 6. renames
//! 7. license, finder script, `package_info.json`
//! 8. verification of expected artifacts

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::driver::BuildDriver;
use crate::builder::errors::{IoResultExt, RecipeError};
use crate::builder::package::{self, PackagedFile};
use crate::builder::patch::{apply_patch, apply_substitutions};
use crate::builder::plan::BuildPlan;
use crate::builder::workdir::WorkDir;

/// Result of a successful execution.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub plan_id: String,
    pub configuration: String,
    pub package_dir: PathBuf,
    pub files: Vec<PackagedFile>,
}

/// Executes build plans against a driver.
pub struct BuildExecutor<'a> {
    driver: &'a dyn BuildDriver,
    assets_dir: PathBuf,
}

impl<'a> BuildExecutor<'a> {
    /// `assets_dir` is where the plan's patch files, finder script and
    /// companion build file live.
    pub fn new(driver: &'a dyn BuildDriver, assets_dir: impl Into<PathBuf>) -> Self {
        BuildExecutor {
            driver,
            assets_dir: assets_dir.into(),
        }
    }

    /// Execute a plan in a staged working directory.
    pub fn execute(&self, plan: &BuildPlan, workdir: &WorkDir) -> Result<BuildOutcome, RecipeError> {
        let root = workdir.root();
        let package_dir = workdir.package_dir();
        let label = plan.configuration.label();

        self.check_assets(plan)?;

        for op in &plan.patches {
            tracing::info!("Applying patch {}", op.patch.display());
            apply_patch(root, &self.assets_dir, op)?;
        }

        tracing::info!("Applying {} source substitution(s)", plan.substitutions.len());
        apply_substitutions(root, &plan.substitutions)?;

        tracing::info!(
            "Building {} with the {} backend ({})",
            plan.library.target,
            plan.backend.as_str(),
            label
        );
        self.driver.build_library(&plan.library, workdir)?;

        if let Some(companion) = &plan.companion {
            let src = self.assets_dir.join(&companion.cmakelists);
            let dst = workdir.resolve(&companion.source_dir).join("CMakeLists.txt");
            fs::copy(&src, &dst).at(&src)?;

            tracing::info!("Building companion library in {}", companion.source_dir.display());
            self.driver.build_companion(companion, workdir)?;
        }

        tracing::info!("Packaging into {}", package_dir.display());
        package::apply_copy_rules(root, &package_dir, &plan.copies)?;
        package::apply_renames(&package_dir, &plan.renames)?;
        package::write_license(&workdir.resolve(&plan.license_source), &package_dir)?;
        package::copy_finder_script(&self.assets_dir, &plan.finder_script, &package_dir)?;
        package::write_package_info(&package_dir, &plan.package_info)?;

        package::verify_expected(&package_dir, &plan.expected)?;

        let files = package::list_package(&package_dir)?;
        tracing::info!("Packaged {} file(s) for {}", files.len(), label);

        Ok(BuildOutcome {
            plan_id: plan.id(),
            configuration: label,
            package_dir,
            files,
        })
    }

    /// Fail before touching the sources or the backend when a recipe asset
    /// is absent.
    fn check_assets(&self, plan: &BuildPlan) -> Result<(), RecipeError> {
        let mut assets: Vec<&Path> = plan.patches.iter().map(|op| op.patch.as_path()).collect();
        assets.push(Path::new(&plan.finder_script));
        if let Some(companion) = &plan.companion {
            assets.push(Path::new(&companion.cmakelists));
        }

        for asset in assets {
            let path = self.assets_dir.join(asset);
            if !path.is_file() {
                return Err(RecipeError::io(
                    path,
                    io::Error::new(io::ErrorKind::NotFound, "recipe asset not found"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::plan::PACKAGE_INFO_FILE;
    use crate::core::config::{Arch, BuildType, CompilerFamily, CompilerIdentity, Configuration, Options, Platform};
    use crate::core::recipe::{PatchSpec, Recipe};
    use crate::test_support::{pristine_tree, recipe_with_assets, FakeDriver};
    use tempfile::TempDir;

    fn config(os: Platform, compiler: CompilerFamily, build_type: BuildType, options: Options) -> Configuration {
        Configuration::new(os, Arch::X86_64, CompilerIdentity::new(compiler, "11"), build_type, options)
    }

    struct Fixture {
        _tmp: TempDir,
        recipe: Recipe,
        workdir: WorkDir,
    }

    fn staged() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let pristine = pristine_tree(tmp.path());
        let recipe = recipe_with_assets(tmp.path());
        let workdir = WorkDir::stage(tmp.path().join("work"), &pristine, &recipe).unwrap();
        Fixture {
            _tmp: tmp,
            recipe,
            workdir,
        }
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    #[test]
    fn test_linux_static_minizip_package() {
        let fx = staged();
        let cfg = config(
            Platform::Linux,
            CompilerFamily::Gcc,
            BuildType::Release,
            Options {
                minizip: true,
                ..Options::default()
            },
        );
        let plan = BuildPlan::resolve(&fx.recipe, &cfg);
        let driver = FakeDriver::for_plan(&plan);

        let outcome = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap();

        assert_eq!(driver.calls(), vec!["library libz.a", "companion source/contrib/minizip"]);

        let package = &outcome.package_dir;
        assert_eq!(names_in(&package.join("lib")), vec!["libminizip.a", "libz.a", "pkgconfig"]);
        assert_eq!(names_in(&package.join("include")), vec!["minizip", "zconf.h", "zlib.h"]);
        assert_eq!(names_in(&package.join("include/minizip")), vec!["zip.h"]);
        assert!(names_in(&package.join("bin")).is_empty());
        assert!(package.join("FindZLIB.cmake").is_file());
        assert!(package.join("licenses/LICENSE").is_file());

        // The configured header from the build directory wins over the pristine one
        assert_eq!(
            fs::read_to_string(package.join("include/zconf.h")).unwrap(),
            "fake zconf.h"
        );

        let info: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(package.join(PACKAGE_INFO_FILE)).unwrap()).unwrap();
        assert_eq!(info["libs"], serde_json::json!(["minizip", "z"]));
        assert_eq!(info["version"], "1.2.11");

        assert!(outcome
            .files
            .iter()
            .all(|f| !f.path.to_string_lossy().contains(".so")));
        assert_eq!(outcome.plan_id, plan.id());
    }

    #[test]
    fn test_substitutions_applied_before_build() {
        let fx = staged();
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Linux, CompilerFamily::Gcc, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan);
        BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap();

        let zconf = fs::read_to_string(fx.workdir.source_dir().join("zconf.h.in")).unwrap();
        assert!(zconf.contains("#if defined(HAVE_UNISTD_H) && (1-HAVE_UNISTD_H-1 != 0)"));
        assert!(!zconf.contains("may be set to #if 1"));

        let configure = fs::read_to_string(fx.workdir.source_dir().join("configure")).unwrap();
        assert!(configure.contains("$LDSHARED $LDFLAGS"));
    }

    #[test]
    fn test_drift_aborts_before_backend() {
        let fx = staged();
        let gzguts = fx.workdir.source_dir().join("gzguts.h");
        fs::write(&gzguts, "/* upstream rewrote this header */\n").unwrap();

        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Linux, CompilerFamily::Gcc, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan);
        let err = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap_err();

        match err {
            RecipeError::SourceDrift { file, anchor, .. } => {
                assert_eq!(file, PathBuf::from("source/gzguts.h"));
                assert_eq!(anchor, "#if defined(_WIN32) || defined(__CYGWIN__)");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(driver.calls().is_empty());
        assert!(!fx.workdir.package_dir().exists());
    }

    #[test]
    fn test_backend_failure_is_passed_through() {
        let fx = staged();
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Linux, CompilerFamily::Gcc, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan).failing(2, "adler32.c:1: error: boom");

        let err = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap_err();
        assert!(matches!(err, RecipeError::BackendInvocation { code: Some(2), .. }));
        assert!(err.to_string().ends_with("adler32.c:1: error: boom"));
    }

    #[test]
    fn test_missing_library_is_reported() {
        let fx = staged();
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Macos, CompilerFamily::AppleClang, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan).without_outputs();

        let err = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap_err();
        match err {
            RecipeError::ArtifactMissing { artifact, pattern } => {
                assert_eq!(artifact, "zlib");
                assert_eq!(pattern, "lib/libz.a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_msvc_debug_static_is_renamed() {
        let fx = staged();
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Windows, CompilerFamily::Msvc, BuildType::Debug, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan);

        let outcome = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap();
        assert_eq!(driver.calls(), vec!["library zlibstatic"]);
        assert_eq!(names_in(&outcome.package_dir.join("lib")), vec!["zlib.lib"]);
    }

    #[test]
    fn test_msvc_shared_packages_dll() {
        let fx = staged();
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(
                Platform::Windows,
                CompilerFamily::Msvc,
                BuildType::Release,
                Options {
                    shared: true,
                    ..Options::default()
                },
            ),
        );
        let driver = FakeDriver::for_plan(&plan);

        let outcome = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap();
        assert_eq!(names_in(&outcome.package_dir.join("bin")), vec!["zlib1.dll"]);
        assert_eq!(names_in(&outcome.package_dir.join("lib")), vec!["zlib.lib"]);
    }

    #[test]
    fn test_missing_companion_asset_fails_before_backend() {
        let fx = staged();
        fs::remove_file(fx.recipe.asset("CMakeLists_minizip.txt")).unwrap();
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(
                Platform::Linux,
                CompilerFamily::Clang,
                BuildType::Release,
                Options {
                    minizip: true,
                    ..Options::default()
                },
            ),
        );
        let driver = FakeDriver::for_plan(&plan);

        let err = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap_err();
        match err {
            RecipeError::Io { path, .. } => assert!(path.ends_with("CMakeLists_minizip.txt")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_missing_finder_script_fails_before_any_edit() {
        let fx = staged();
        fs::remove_file(fx.recipe.asset("FindZLIB.cmake")).unwrap();
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Linux, CompilerFamily::Gcc, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan);

        let err = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap_err();
        match err {
            RecipeError::Io { path, source } => {
                assert!(path.ends_with("FindZLIB.cmake"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(driver.calls().is_empty());

        let zconf = fs::read_to_string(fx.workdir.source_dir().join("zconf.h")).unwrap();
        assert!(zconf.contains("may be set to #if 1"));
    }

    #[test]
    fn test_missing_patch_file_fails_before_backend() {
        let mut fx = staged();
        fx.recipe.patches.push(PatchSpec {
            file: "missing.patch".into(),
            base: PathBuf::new(),
            strip: 1,
        });
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Macos, CompilerFamily::AppleClang, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan);

        let err = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap_err();
        assert!(matches!(err, RecipeError::Io { ref path, .. } if path.ends_with("missing.patch")));
        assert!(driver.calls().is_empty());
    }

    const GZGUTS_PATCH: &str = "\
--- a/gzguts.h
+++ b/gzguts.h
@@ -1,4 +1,4 @@
 /* gzguts.h -- zlib internal header definitions for gz* operations */
-#if defined(_WIN32) || defined(__CYGWIN__)
+#if defined(_WIN32)
 #  define WIDECHAR
 #endif
";

    const IOAPI_PATCH: &str = "\
--- a/ioapi.h
+++ b/ioapi.h
@@ -1,2 +1,3 @@
 /* ioapi.h -- IO base function header for compress/uncompress .zip */
 #include \"zlib.h\"
+#define USE_FILE32API
";

    #[test]
    fn test_patches_land_before_substitutions() {
        let mut fx = staged();
        fs::write(fx.recipe.asset("gzguts.patch"), GZGUTS_PATCH).unwrap();
        fx.recipe.patches.push(PatchSpec {
            file: "gzguts.patch".into(),
            base: PathBuf::new(),
            strip: 1,
        });
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Linux, CompilerFamily::Gcc, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan);

        let err = BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap_err();

        // The patch removed the anchor the gzguts.h substitution expects
        match err {
            RecipeError::SourceDrift { file, anchor, .. } => {
                assert_eq!(file, PathBuf::from("source/gzguts.h"));
                assert_eq!(anchor, "#if defined(_WIN32) || defined(__CYGWIN__)");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(driver.calls().is_empty());

        let gzguts = fs::read_to_string(fx.workdir.source_dir().join("gzguts.h")).unwrap();
        assert!(gzguts.contains("#if defined(_WIN32)\n"));
    }

    #[test]
    fn test_clean_patch_and_substitutions_both_apply() {
        let mut fx = staged();
        fs::write(fx.recipe.asset("minizip.patch"), IOAPI_PATCH).unwrap();
        fx.recipe.patches.push(PatchSpec {
            file: "minizip.patch".into(),
            base: PathBuf::from("contrib/minizip"),
            strip: 1,
        });
        let plan = BuildPlan::resolve(
            &fx.recipe,
            &config(Platform::Linux, CompilerFamily::Gcc, BuildType::Release, Options::default()),
        );
        let driver = FakeDriver::for_plan(&plan);

        BuildExecutor::new(&driver, &fx.recipe.assets_dir)
            .execute(&plan, &fx.workdir)
            .unwrap();
        assert_eq!(driver.calls(), vec!["library libz.a"]);

        let ioapi = fs::read_to_string(fx.workdir.source_dir().join("contrib/minizip/ioapi.h")).unwrap();
        assert!(ioapi.ends_with("#define USE_FILE32API\n"));

        let gzguts = fs::read_to_string(fx.workdir.source_dir().join("gzguts.h")).unwrap();
        assert!(gzguts.contains("#if defined(_WIN32) || defined(__MINGW32__)"));
    }
}
