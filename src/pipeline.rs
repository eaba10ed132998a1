//! The ordered list of external commands that makes up one run.
//!
//! A `Step` is plain data: which dependency it belongs to, what phase it is,
//! which program to run with which arguments and environment, and where.
//! `plan()` produces the complete sequence up front so it can be printed in
//! dry-run mode and inspected in tests without spawning anything.
//!
//! ```text
//! fetch GKlib, fetch METIS, fetch ParMETIS, fetch superlu_dist,
//! configure+install GKlib, configure+install METIS,
//! configure+install ParMETIS, configure+install superlu_dist
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

use crate::build_state::BuildStage;
use crate::config::BuildConfig;
use crate::dependency::Dependency;
use crate::step_args::{
    CmakeConfigureArgs, GitCloneArgs, MakeConfigArgs, MakeInstallArgs, StepArgs,
    SUPERLU_BUILD_DIR,
};

/// What a step does for its dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StepPhase {
    /// `git clone`
    Fetch,
    /// `make config` or cmake build-tree generation
    Configure,
    /// `make install`
    Install,
}

/// A program, its arguments and environment, and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Build an invocation from typed tool arguments.
    pub fn from_args<A: StepArgs>(working_dir: impl Into<PathBuf>, args: &A) -> Self {
        Self {
            program: args.program().to_string(),
            args: args.to_cli_args(),
            env: args.get_env_vars(),
            working_dir: working_dir.into(),
        }
    }

    /// Shell-like rendering used for echoing and dry runs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(|c: char| c.is_whitespace() || c == ';') {
                line.push_str(&format!("'{}'", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(cd {} && {})", self.working_dir.display(), self.command_line())
    }
}

/// One external command in the pipeline, attributed to a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub dependency: Dependency,
    pub phase: StepPhase,
    pub command: Invocation,
}

impl Step {
    pub fn from_args<A: StepArgs>(
        dependency: Dependency,
        phase: StepPhase,
        working_dir: impl Into<PathBuf>,
        args: &A,
    ) -> Self {
        Self {
            dependency,
            phase,
            command: Invocation::from_args(working_dir, args),
        }
    }

    /// Stage the build context is in while this step runs.
    pub fn stage(&self) -> BuildStage {
        match self.phase {
            StepPhase::Fetch => BuildStage::Fetching,
            StepPhase::Configure | StepPhase::Install => BuildStage::building(self.dependency),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.dependency, self.phase, self.command)
    }
}

/// Clone steps for every dependency, run from the download directory.
pub fn fetch_steps(download_dir: &Path) -> Vec<Step> {
    Dependency::ordered()
        .into_iter()
        .map(|dep| {
            Step::from_args(
                dep,
                StepPhase::Fetch,
                download_dir,
                &GitCloneArgs::for_dependency(dep),
            )
        })
        .collect()
}

/// Configure and install steps for one dependency.
pub fn build_steps(dependency: Dependency, download_dir: &Path, config: &BuildConfig) -> Vec<Step> {
    let source_dir = download_dir.join(dependency.dir_name());
    let install = MakeInstallArgs { jobs: config.jobs };

    if dependency.uses_make_config() {
        let configure = MakeConfigArgs {
            prefix: config.install_dir.clone(),
            cc: dependency.needs_compiler().then(|| config.cc.clone()),
            jobs: config.jobs,
        };
        vec![
            Step::from_args(dependency, StepPhase::Configure, &source_dir, &configure),
            Step::from_args(dependency, StepPhase::Install, &source_dir, &install),
        ]
    } else {
        let configure =
            CmakeConfigureArgs::for_superlu(&config.install_dir, &config.mpi_include, config.jobs);
        vec![
            Step::from_args(dependency, StepPhase::Configure, &source_dir, &configure),
            Step::from_args(
                dependency,
                StepPhase::Install,
                source_dir.join(SUPERLU_BUILD_DIR),
                &install,
            ),
        ]
    }
}

/// The full pipeline: every fetch, then every build in dependency order.
pub fn plan(download_dir: &Path, config: &BuildConfig) -> Vec<Step> {
    let mut steps = fetch_steps(download_dir);
    for dep in Dependency::ordered() {
        steps.extend(build_steps(dep, download_dir, config));
    }
    steps
}
