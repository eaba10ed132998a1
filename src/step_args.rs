//! Type-safe tool argument contracts.
//!
//! Each external tool invocation (git, make, cmake) is described by a struct
//! implementing [`StepArgs`]. The struct definition is the contract: the
//! parameter spelling each upstream build system expects (`prefix=`, `cc=`,
//! `-DTPL_PARMETIS_LIBRARIES=`) lives in exactly one place.

use std::path::{Path, PathBuf};

use crate::dependency::Dependency;

/// Trait for typed tool arguments.
///
/// # Contract
///
/// - `program()`: executable name, resolved through `PATH` at spawn time.
/// - `to_cli_args()`: arguments exactly as the tool expects them.
/// - `get_env_vars()`: extra environment for the child process.
pub trait StepArgs {
    /// Executable to run (e.g., "git", "make", "cmake").
    fn program(&self) -> &str;

    /// Convert struct fields to command line arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Environment variables to set on the child.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// `git clone <url> <dir>`
///
/// ```
/// use solver_deps::dependency::Dependency;
/// use solver_deps::step_args::{GitCloneArgs, StepArgs};
///
/// let args = GitCloneArgs::for_dependency(Dependency::Metis);
/// assert_eq!(
///     args.to_cli_args(),
///     vec!["clone", "https://github.com/KarypisLab/METIS.git", "METIS"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCloneArgs {
    pub url: String,
    pub target: String,
}

impl GitCloneArgs {
    pub fn for_dependency(dependency: Dependency) -> Self {
        Self {
            url: dependency.repository().to_string(),
            target: dependency.dir_name().to_string(),
        }
    }
}

impl StepArgs for GitCloneArgs {
    fn program(&self) -> &str {
        "git"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["clone".to_string(), self.url.clone(), self.target.clone()]
    }

    // No terminal access from a background process group: fail, don't prompt
    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())]
    }
}

/// Parallelism hint exported to build tools. Never part of the command line.
fn jobs_env(jobs: Option<u32>) -> Vec<(String, String)> {
    match jobs {
        Some(n) => vec![
            ("MAKEFLAGS".to_string(), format!("-j{}", n)),
            ("CMAKE_BUILD_PARALLEL_LEVEL".to_string(), n.to_string()),
        ],
        None => Vec::new(),
    }
}

/// `make config [cc=<cc>] prefix=<install_dir>` for the Karypis lab libraries.
///
/// # Field to Parameter Mapping
///
/// | Rust Field | make variable | Notes |
/// |------------|---------------|-------|
/// | `cc`       | `cc=`         | ParMETIS only (MPI compiler wrapper) |
/// | `prefix`   | `prefix=`     | Always present |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeConfigArgs {
    pub prefix: PathBuf,
    pub cc: Option<String>,
    pub jobs: Option<u32>,
}

impl StepArgs for MakeConfigArgs {
    fn program(&self) -> &str {
        "make"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["config".to_string()];
        if let Some(cc) = &self.cc {
            args.push(format!("cc={}", cc));
        }
        args.push(format!("prefix={}", self.prefix.display()));
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        jobs_env(self.jobs)
    }
}

/// `make install`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeInstallArgs {
    pub jobs: Option<u32>,
}

impl StepArgs for MakeInstallArgs {
    fn program(&self) -> &str {
        "make"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["install".to_string()]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        jobs_env(self.jobs)
    }
}

/// Directory (relative to the superlu_dist checkout) cmake generates into.
pub const SUPERLU_BUILD_DIR: &str = "build";

/// Build-tree generation for superlu_dist.
///
/// # Field to Flag Mapping
///
/// | Rust Field      | cmake flag |
/// |-----------------|------------|
/// | `include_dirs`  | `-DTPL_PARMETIS_INCLUDE_DIRS=a;b` |
/// | `libraries`     | `-DTPL_PARMETIS_LIBRARIES=a;b;c` |
/// | `internal_blas` | `-DTPL_ENABLE_INTERNAL_BLASLIB=ON` |
/// | `install_prefix`| `-DCMAKE_INSTALL_PREFIX=` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmakeConfigureArgs {
    pub include_dirs: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
    pub internal_blas: bool,
    pub install_prefix: PathBuf,
    pub jobs: Option<u32>,
}

impl CmakeConfigureArgs {
    /// Parameters for linking superlu_dist against the partitioners installed
    /// under `install_dir`.
    pub fn for_superlu(install_dir: &Path, mpi_include: &Path, jobs: Option<u32>) -> Self {
        let lib_dir = install_dir.join("lib");
        // GKlib first, then ParMETIS before METIS: static link order
        let libraries = [Dependency::Gklib, Dependency::Parmetis, Dependency::Metis]
            .into_iter()
            .filter_map(|dep| dep.static_archive())
            .map(|archive| lib_dir.join(archive))
            .collect();

        Self {
            include_dirs: vec![install_dir.join("include"), mpi_include.to_path_buf()],
            libraries,
            internal_blas: true,
            install_prefix: install_dir.to_path_buf(),
            jobs,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(";")
}

impl StepArgs for CmakeConfigureArgs {
    fn program(&self) -> &str {
        "cmake"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            ".".to_string(),
            "-B".to_string(),
            SUPERLU_BUILD_DIR.to_string(),
            format!("-DTPL_PARMETIS_INCLUDE_DIRS={}", join_paths(&self.include_dirs)),
            format!("-DTPL_PARMETIS_LIBRARIES={}", join_paths(&self.libraries)),
        ];
        if self.internal_blas {
            args.push("-DTPL_ENABLE_INTERNAL_BLASLIB=ON".to_string());
        }
        args.push(format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            self.install_prefix.display()
        ));
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        jobs_env(self.jobs)
    }
}

/// `<tool> --version`, used by the optional preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheckArgs {
    pub tool: String,
}

impl StepArgs for VersionCheckArgs {
    fn program(&self) -> &str {
        &self.tool
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["--version".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_config_without_compiler() {
        let args = MakeConfigArgs {
            prefix: PathBuf::from("/home/u/.local"),
            cc: None,
            jobs: None,
        };
        assert_eq!(args.program(), "make");
        assert_eq!(args.to_cli_args(), vec!["config", "prefix=/home/u/.local"]);
        assert!(args.get_env_vars().is_empty());
    }

    #[test]
    fn test_make_config_with_compiler() {
        let args = MakeConfigArgs {
            prefix: PathBuf::from("/opt/deps"),
            cc: Some("mpicc".to_string()),
            jobs: None,
        };
        assert_eq!(args.to_cli_args(), vec!["config", "cc=mpicc", "prefix=/opt/deps"]);
    }

    #[test]
    fn test_jobs_only_touch_environment() {
        let args = MakeInstallArgs { jobs: Some(8) };
        assert_eq!(args.to_cli_args(), vec!["install"]);
        assert_eq!(
            args.get_env_vars(),
            vec![
                ("MAKEFLAGS".to_string(), "-j8".to_string()),
                ("CMAKE_BUILD_PARALLEL_LEVEL".to_string(), "8".to_string()),
            ]
        );
    }

    #[test]
    fn test_cmake_configure_for_superlu() {
        let args = CmakeConfigureArgs::for_superlu(
            Path::new("/p"),
            Path::new("/usr/include/mpich"),
            None,
        );
        assert_eq!(args.program(), "cmake");
        assert_eq!(
            args.to_cli_args(),
            vec![
                "-S",
                ".",
                "-B",
                "build",
                "-DTPL_PARMETIS_INCLUDE_DIRS=/p/include;/usr/include/mpich",
                "-DTPL_PARMETIS_LIBRARIES=/p/lib/libGKlib.a;/p/lib/libparmetis.a;/p/lib/libmetis.a",
                "-DTPL_ENABLE_INTERNAL_BLASLIB=ON",
                "-DCMAKE_INSTALL_PREFIX=/p",
            ]
        );
    }

    #[test]
    fn test_git_clone_targets_repository_name() {
        let args = GitCloneArgs::for_dependency(Dependency::SuperluDist);
        assert_eq!(args.program(), "git");
        assert_eq!(args.target, "superlu_dist");
    }
}
