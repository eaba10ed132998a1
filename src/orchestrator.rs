//! Fail-fast execution of the solver dependency pipeline.
//!
//! The orchestrator owns the configuration, the download directory, a
//! [`CommandRunner`] and the [`BuildContext`]. It validates inputs, optionally
//! checks the toolchain, then walks `pipeline::plan()` in order. The first
//! step that cannot run or exits non-zero aborts the run; nothing after it is
//! attempted and nothing before it is undone.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::build_state::{BuildContext, BuildStage};
use crate::config::BuildConfig;
use crate::error::{EXIT_NOT_LAUNCHED, Result, SolverDepsError};
use crate::pipeline::{self, Invocation, Step, StepPhase};
use crate::runner::CommandRunner;
use crate::step_args::VersionCheckArgs;

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub download_dir: PathBuf,
    pub install_dir: PathBuf,
    pub steps: Vec<Step>,
    pub dry_run: bool,
}

/// Drives one run of the pipeline.
pub struct Orchestrator<R: CommandRunner> {
    download_dir: PathBuf,
    config: BuildConfig,
    runner: R,
    check_tools: bool,
    context: BuildContext,
    completed: Vec<Step>,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(download_dir: impl Into<PathBuf>, config: BuildConfig, runner: R) -> Self {
        Self {
            download_dir: download_dir.into(),
            config,
            runner,
            check_tools: false,
            context: BuildContext::new(),
            completed: Vec::new(),
        }
    }

    /// Check git, make, cmake and the configured compiler before fetching.
    pub fn with_tool_check(mut self, enabled: bool) -> Self {
        self.check_tools = enabled;
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Steps that finished successfully, in execution order
    pub fn completed_steps(&self) -> &[Step] {
        &self.completed
    }

    /// Run the whole pipeline.
    ///
    /// On failure the context is left in `Aborted` with `aborted_at()` naming
    /// the stage that failed.
    pub fn run(&mut self) -> Result<BuildReport> {
        match self.run_pipeline() {
            Ok(report) => Ok(report),
            Err(e) => {
                let stage = self.context.current_stage();
                if self.context.abort().is_ok() {
                    error!("Aborted during '{}': {}", stage, e);
                }
                Err(e)
            }
        }
    }

    fn run_pipeline(&mut self) -> Result<BuildReport> {
        self.context.transition_to(BuildStage::Validating)?;

        let download_dir = validate_download_dir(&self.download_dir)?;
        self.config.validate()?;
        self.config = self.config.clone().with_absolute_install_dir()?;

        if !self.config.install_dir.is_dir() {
            warn!(
                "Install prefix {} does not exist yet; it is not created here",
                self.config.install_dir.display()
            );
        }

        if self.check_tools {
            self.preflight(&download_dir)?;
        }

        let steps = pipeline::plan(&download_dir, &self.config);
        info!(
            "Building {} steps from {} into {}",
            steps.len(),
            download_dir.display(),
            self.config.install_dir.display()
        );

        let mut dry_run = false;
        for step in steps {
            if self.context.current_stage() != step.stage() {
                self.context.transition_to(step.stage())?;
                info!("==> {}", step.stage());
            }
            dry_run |= self.execute(&step)?;
            self.completed.push(step);
        }

        self.context.transition_to(BuildStage::Done)?;
        info!("All dependencies installed into {}", self.config.install_dir.display());

        Ok(BuildReport {
            download_dir,
            install_dir: self.config.install_dir.clone(),
            steps: self.completed.clone(),
            dry_run,
        })
    }

    /// Run one step; returns whether it was a dry run.
    fn execute(&mut self, step: &Step) -> Result<bool> {
        info!("[{} {}] {}", step.dependency, step.phase, step.command.command_line());
        let (exit_code, source) = match self.runner.run(&step.command) {
            Ok(output) if output.success => return Ok(output.dry_run),
            Ok(output) => (output.exit_code, None),
            Err(SolverDepsError::Spawn { source, .. }) => (Some(EXIT_NOT_LAUNCHED), Some(source)),
            Err(e) => return Err(e),
        };

        Err(match step.phase {
            StepPhase::Fetch => SolverDepsError::Fetch {
                dependency: step.dependency,
                exit_code,
                source,
            },
            phase => SolverDepsError::Build {
                dependency: step.dependency,
                phase,
                exit_code,
                source,
            },
        })
    }

    fn preflight(&mut self, download_dir: &Path) -> Result<()> {
        let tools = ["git", "make", "cmake", self.config.cc.as_str()]
            .map(|tool| VersionCheckArgs { tool: tool.to_string() });

        for check in &tools {
            let invocation = Invocation::from_args(download_dir, check);
            let available = match self.runner.run(&invocation) {
                Ok(output) => output.success,
                Err(SolverDepsError::Spawn { .. }) => false,
                Err(e) => return Err(e),
            };
            if !available {
                return Err(SolverDepsError::MissingTool {
                    tool: check.tool.clone(),
                });
            }
            info!("Found {}", check.tool);
        }
        Ok(())
    }
}

/// The download directory must already exist; it is never created.
pub fn validate_download_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(SolverDepsError::validation(format!(
            "download directory {} does not exist or is not a directory",
            path.display()
        )));
    }
    Ok(path.canonicalize()?)
}
