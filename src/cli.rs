use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::error::SolverDepsError;

/// Fetch and build GKlib, METIS, ParMETIS and SuperLU_DIST
#[derive(Parser, Debug)]
#[command(name = "solver-deps")]
#[command(about = "Clone and install GKlib, METIS, ParMETIS and superlu_dist into a local prefix")]
#[command(version)]
pub struct Cli {
    /// Existing directory to clone the four repositories into
    pub download_dir: PathBuf,

    /// Install prefix (default: $HOME/.local)
    #[arg(long, value_name = "PATH")]
    pub install_dir: Option<PathBuf>,

    /// C compiler passed to ParMETIS (default: mpicc)
    #[arg(long, value_name = "NAME")]
    pub cc: Option<String>,

    /// MPI header directory used by the superlu_dist build
    #[arg(long, value_name = "PATH")]
    pub mpi_include: Option<PathBuf>,

    /// Parallel build hint exported as MAKEFLAGS / CMAKE_BUILD_PARALLEL_LEVEL
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<u32>,

    /// JSON file with install_dir, cc, mpi_include and jobs keys
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dry-run mode: print every command without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Check that git, make, cmake and the compiler respond to --version first
    #[arg(long, conflicts_with = "dry_run")]
    pub check_tools: bool,
}

impl Cli {
    /// Parse an argument vector (first element is the program name).
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    /// Command line override layer
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            install_dir: self.install_dir.clone(),
            cc: self.cc.clone(),
            mpi_include: self.mpi_include.clone(),
            jobs: self.jobs,
        }
    }
}

/// Whether a parse error is a real usage error rather than `--help`/`--version`.
pub fn is_usage_error(err: &clap::Error) -> bool {
    err.use_stderr()
}

/// Convert a clap parse failure into the usage error reported to the user.
pub fn usage_error(err: &clap::Error) -> SolverDepsError {
    SolverDepsError::usage(err.render().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_single_argument() {
        let cli = Cli::try_parse_args(["solver-deps", "/tmp/dl"]).unwrap();
        assert_eq!(cli.download_dir, PathBuf::from("/tmp/dl"));
        assert!(!cli.dry_run);
        assert_eq!(cli.overrides(), ConfigOverrides::default());
    }

    #[test]
    fn test_cli_no_args_is_usage_error() {
        let err = Cli::try_parse_args(["solver-deps"]).unwrap_err();
        assert!(is_usage_error(&err));
        let msg = usage_error(&err).to_string();
        assert!(msg.contains("Usage: solver-deps"));
        assert!(msg.contains("<DOWNLOAD_DIR>"));
    }

    #[test]
    fn test_cli_two_positionals_rejected() {
        let err = Cli::try_parse_args(["solver-deps", "/a", "/b"]).unwrap_err();
        assert!(is_usage_error(&err));
    }

    #[test]
    fn test_cli_usage_names_invoking_command() {
        let err = Cli::try_parse_args(["/usr/local/bin/install-solvers"]).unwrap_err();
        assert!(usage_error(&err).to_string().contains("install-solvers"));
    }

    #[test]
    fn test_cli_help_is_not_usage_error() {
        let err = Cli::try_parse_args(["solver-deps", "--help"]).unwrap_err();
        assert!(!is_usage_error(&err));
    }

    #[test]
    fn test_cli_check_tools_conflicts_with_dry_run() {
        let err = Cli::try_parse_args(["solver-deps", "--dry-run", "--check-tools", "/tmp/dl"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        assert!(is_usage_error(&err));

        let cli = Cli::try_parse_args(["solver-deps", "--check-tools", "/tmp/dl"]).unwrap();
        assert!(cli.check_tools);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_args([
            "solver-deps",
            "--install-dir",
            "/opt/solver",
            "--cc",
            "mpiicc",
            "--mpi-include",
            "/usr/include/mpich",
            "-j",
            "8",
            "--dry-run",
            "/tmp/dl",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.install_dir, Some(PathBuf::from("/opt/solver")));
        assert_eq!(overrides.cc.as_deref(), Some("mpiicc"));
        assert_eq!(overrides.mpi_include, Some(PathBuf::from("/usr/include/mpich")));
        assert_eq!(overrides.jobs, Some(8));
        assert!(cli.dry_run);
    }
}
