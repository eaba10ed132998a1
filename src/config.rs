//! Build configuration.
//!
//! `BuildConfig` carries the install prefix, the ParMETIS compiler and the
//! MPI header directory. It is layered as
//! defaults < config file < environment < command line, each layer being a
//! `ConfigOverrides` with only the keys it actually sets.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SolverDepsError;

/// MPI compiler wrapper used for ParMETIS.
pub const DEFAULT_CC: &str = "mpicc";

/// Header directory of the distribution OpenMPI package.
pub const DEFAULT_MPI_INCLUDE: &str = "/usr/lib/x86_64-linux-gnu/openmpi/include";

/// Environment variable names recognized by `ConfigOverrides::from_env`.
pub const ENV_INSTALL_DIR: &str = "SOLVER_DEPS_INSTALL_DIR";
pub const ENV_CC: &str = "SOLVER_DEPS_CC";
pub const ENV_MPI_INCLUDE: &str = "SOLVER_DEPS_MPI_INCLUDE";
pub const ENV_JOBS: &str = "SOLVER_DEPS_JOBS";

/// `$HOME/.local`, or `.local` relative to the working directory when no
/// home directory can be determined.
pub fn default_install_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".local"),
        None => {
            tracing::warn!("Could not determine home directory, using ./.local");
            PathBuf::from(".local")
        }
    }
}

/// Fully resolved configuration passed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Install prefix shared by all four builds
    pub install_dir: PathBuf,
    /// C compiler passed to ParMETIS `make config`
    pub cc: String,
    /// MPI header directory for the superlu_dist build
    pub mpi_include: PathBuf,
    /// Optional parallel build hint
    pub jobs: Option<u32>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            cc: DEFAULT_CC.to_string(),
            mpi_include: PathBuf::from(DEFAULT_MPI_INCLUDE),
            jobs: None,
        }
    }
}

impl BuildConfig {
    /// Apply one override layer on top of this configuration.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(install_dir) = overrides.install_dir {
            self.install_dir = install_dir;
        }
        if let Some(cc) = overrides.cc {
            self.cc = cc;
        }
        if let Some(mpi_include) = overrides.mpi_include {
            self.mpi_include = mpi_include;
        }
        if overrides.jobs.is_some() {
            self.jobs = overrides.jobs;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.cc.trim().is_empty() {
            return Err(SolverDepsError::config("compiler name must not be empty"));
        }
        if self.cc.chars().any(char::is_whitespace) {
            return Err(SolverDepsError::config(format!(
                "compiler name '{}' must not contain whitespace",
                self.cc
            )));
        }
        if self.install_dir.as_os_str().is_empty() {
            return Err(SolverDepsError::config("install directory must not be empty"));
        }
        if !self.mpi_include.is_absolute() {
            return Err(SolverDepsError::config(format!(
                "MPI include directory must be an absolute path, got {:?}",
                self.mpi_include
            )));
        }
        if self.jobs == Some(0) {
            return Err(SolverDepsError::config("jobs must be at least 1"));
        }
        Ok(())
    }

    /// Make the install prefix absolute.
    ///
    /// Build steps run inside each checkout; the prefix must resolve the same
    /// for all of them. The directory itself is not created.
    pub fn with_absolute_install_dir(mut self) -> crate::error::Result<Self> {
        if self.install_dir.is_relative() {
            self.install_dir = std::path::absolute(&self.install_dir)?;
        }
        Ok(self)
    }
}

/// A partial configuration layer. Unset keys leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub install_dir: Option<PathBuf>,
    pub cc: Option<String>,
    pub mpi_include: Option<PathBuf>,
    pub jobs: Option<u32>,
}

impl ConfigOverrides {
    /// Load overrides from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let overrides: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(overrides)
    }

    /// Read overrides through an environment-style lookup.
    ///
    /// Empty values count as unset.
    pub fn from_env<F>(lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jobs = match get(ENV_JOBS) {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|e| {
                SolverDepsError::config(format!("{}={:?} is not a job count: {}", ENV_JOBS, raw, e))
            })?),
            None => None,
        };

        Ok(Self {
            install_dir: get(ENV_INSTALL_DIR).map(PathBuf::from),
            cc: get(ENV_CC),
            mpi_include: get(ENV_MPI_INCLUDE).map(PathBuf::from),
            jobs,
        })
    }

    /// Read overrides from the process environment
    pub fn from_process_env() -> crate::error::Result<Self> {
        Self::from_env(|key| std::env::var(key).ok())
    }
}
