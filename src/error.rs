//! Error handling module for solver-deps
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Fetch and build failures carry the exit status of the tool that failed so
//! the binary can propagate it unchanged.

use thiserror::Error;

use crate::dependency::Dependency;
use crate::pipeline::StepPhase;

/// Main error type for solver-deps
#[derive(Error, Debug)]
pub enum SolverDepsError {
    /// Wrong argument count or malformed flags
    #[error("{0}")]
    Usage(String),

    /// Download directory or other input rejected before anything ran
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (config file, environment overrides)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required tool did not answer `--version` during preflight
    #[error("Required tool '{tool}' is not available")]
    MissingTool { tool: String },

    /// A clone step exited non-zero or git could not be started
    #[error("Fetching {dependency} failed ({})", describe_failure(*exit_code, source.as_ref()))]
    Fetch {
        dependency: Dependency,
        exit_code: Option<i32>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A configure or install step exited non-zero or its tool could not be started
    #[error("{phase} step for {dependency} failed ({})", describe_failure(*exit_code, source.as_ref()))]
    Build {
        dependency: Dependency,
        phase: StepPhase,
        exit_code: Option<i32>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// SIGINT, SIGTERM or SIGHUP arrived; running tools were terminated
    #[error("Interrupted by {}", signal_name(*signal))]
    Interrupted { signal: i32 },

    /// The tool could not be launched at all
    #[error("Failed to spawn '{program}' in {}: {source}", working_dir.display())]
    Spawn {
        program: String,
        working_dir: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Build stage machine transition errors
    #[error("Build transition error: {0}")]
    Transition(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exit status reported for a tool that could not be started, as a shell does
pub const EXIT_NOT_LAUNCHED: i32 = 127;

fn describe_failure(code: Option<i32>, launch_error: Option<&std::io::Error>) -> String {
    match (launch_error, code) {
        (Some(e), _) => format!("could not start: {}", e),
        (None, Some(code)) => format!("exit code {}", code),
        (None, None) => "terminated by signal".to_string(),
    }
}

fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| format!("signal {}", signal))
}

/// Result type alias for solver-deps operations
pub type Result<T> = std::result::Result<T, SolverDepsError>;

impl SolverDepsError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Dependency the failure is attributed to, if any
    pub fn dependency(&self) -> Option<Dependency> {
        match self {
            Self::Fetch { dependency, .. } | Self::Build { dependency, .. } => Some(*dependency),
            _ => None,
        }
    }

    /// Process exit status for this error.
    ///
    /// Tool failures propagate the tool's own non-zero status and an
    /// interrupted run reports `128 + signal`. Everything else, including
    /// tools killed by a signal, maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fetch { exit_code, .. } | Self::Build { exit_code, .. } => match exit_code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
            Self::Interrupted { signal } => 128 + signal,
            _ => 1,
        }
    }
}
