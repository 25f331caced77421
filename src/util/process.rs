//! Subprocess execution utilities.
//!
//! Every process gets an explicit working directory; nothing in this crate
//! changes the current directory of the running process.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::builder::errors::RecipeError;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion.
    pub fn exec(&self) -> std::io::Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("running `{}`", self.display_command());
        cmd.spawn()?.wait_with_output()
    }

    /// Execute and require success.
    ///
    /// A failed spawn or a non-zero exit becomes
    /// [`RecipeError::BackendInvocation`] carrying the tool's stderr as-is.
    pub fn exec_and_check(&self) -> Result<Output, RecipeError> {
        let output = self.exec().map_err(|e| RecipeError::BackendInvocation {
            command: self.display_command(),
            code: None,
            stderr: format!("failed to spawn `{}`: {}", self.program.display(), e),
        })?;

        if !output.status.success() {
            return Err(RecipeError::BackendInvocation {
                command: self.display_command(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}

/// Find a make implementation.
pub fn find_make() -> Option<PathBuf> {
    // Check MAKE environment variable first
    if let Ok(make) = std::env::var("MAKE") {
        if let Some(path) = find_executable(&make) {
            return Some(path);
        }
    }

    ["make", "gmake", "mingw32-make"]
        .iter()
        .find_map(|name| find_executable(name))
}

/// Find a POSIX shell for running `configure`.
pub fn find_sh() -> Option<PathBuf> {
    find_executable("sh")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_exec_uses_explicit_cwd() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = ProcessBuilder::new("pwd").cwd(tmp.path()).exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = std::fs::canonicalize(stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(tmp.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_passes_stderr_through() {
        let err = ProcessBuilder::new("sh")
            .args(["-c", "echo 'zutil.c:1: error: boom' >&2; exit 3"])
            .exec_and_check()
            .unwrap_err();

        match err {
            RecipeError::BackendInvocation { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "zutil.c:1: error: boom\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_spawn_failure_is_backend_error() {
        let err = ProcessBuilder::new("zrecipe-no-such-tool")
            .exec_and_check()
            .unwrap_err();
        assert!(matches!(err, RecipeError::BackendInvocation { code: None, .. }));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("make").args(["-j4", "libz.a"]);

        assert_eq!(pb.display_command(), "make -j4 libz.a");
        assert_eq!(pb.get_args(), &["-j4".to_string(), "libz.a".to_string()]);
    }
}
