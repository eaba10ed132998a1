//! Command execution
//!
//! Every external tool goes through a [`CommandRunner`]. The production
//! [`ProcessRunner`] spawns the tool in its own process group, registers it
//! with the global [`ChildRegistry`] and waits for it; tool output streams
//! straight to the terminal. [`DryRunRunner`] only prints what would run.

use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::error::{Result, SolverDepsError};
use crate::pipeline::Invocation;
use crate::process_guard::{self, ChildRegistry, CommandProcessGroup};

/// Outcome of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
    /// Whether the command exited with status 0
    pub success: bool,
    /// Whether the command was only printed, not run
    pub dry_run: bool,
}

impl StepOutput {
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            dry_run: false,
        }
    }

    pub fn failed(exit_code: Option<i32>) -> Self {
        Self {
            exit_code,
            success: false,
            dry_run: false,
        }
    }

    pub fn skipped() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            dry_run: true,
        }
    }
}

/// Executes invocations synchronously.
pub trait CommandRunner {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit is reported through `StepOutput`, not as an `Err`;
    /// `Err` means the command could not be run at all.
    fn run(&mut self, invocation: &Invocation) -> Result<StepOutput>;
}

/// Spawns real processes.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<StepOutput> {
        if let Some(signal) = process_guard::interrupted() {
            return Err(SolverDepsError::Interrupted { signal });
        }
        info!("Running: {}", invocation);
        if !invocation.env.is_empty() {
            debug!("Environment: {:?}", invocation.env);
        }

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .in_new_process_group();

        let mut child = cmd.spawn().map_err(|source| SolverDepsError::Spawn {
            program: invocation.program.clone(),
            working_dir: invocation.working_dir.clone(),
            source,
        })?;
        let pid = child.id();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }
        // A signal that arrived between spawn and register missed this group
        if process_guard::interrupted().is_some() {
            process_guard::terminate_groups(&[pid], process_guard::INTERRUPT_GRACE);
        }

        let status = child.wait();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        // Whatever the tool reported, it was stopped on our behalf
        if let Some(signal) = process_guard::interrupted() {
            return Err(SolverDepsError::Interrupted { signal });
        }

        let status = status?;
        if status.success() {
            debug!("{} finished successfully", invocation.program);
            Ok(StepOutput::succeeded())
        } else {
            Ok(StepOutput::failed(status.code()))
        }
    }
}

/// Prints each invocation instead of running it.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    printed: Vec<String>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines printed so far
    pub fn printed(&self) -> &[String] {
        &self.printed
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<StepOutput> {
        let line = format!("[DRY RUN] {}", invocation);
        println!("{}", line);
        self.printed.push(line);
        Ok(StepOutput::skipped())
    }
}
