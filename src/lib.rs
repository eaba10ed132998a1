//! solver-deps Library
//!
//! Fetches and builds GKlib, METIS, ParMETIS and superlu_dist into a local
//! install prefix as one fail-fast pipeline of external commands.

pub mod build_state;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod process_guard;
pub mod runner;
pub mod step_args;

// Re-export main types for convenience
pub use build_state::{BuildContext, BuildStage, BuildTransitionError};
pub use config::{BuildConfig, ConfigOverrides};
pub use dependency::Dependency;
pub use error::SolverDepsError;
pub use orchestrator::{BuildReport, Orchestrator};
pub use pipeline::{Invocation, Step, StepPhase, plan};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use runner::{CommandRunner, DryRunRunner, ProcessRunner, StepOutput};
pub use step_args::StepArgs;
