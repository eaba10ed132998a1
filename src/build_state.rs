//! Build State Machine
//!
//! Authoritative record of how far a run has progressed. Transitions are
//! validated so the orchestrator cannot skip a dependency or move backwards.
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! Validating
//!     ↓
//! Fetching
//!     ↓
//! BuildingGklib
//!     ↓
//! BuildingMetis
//!     ↓
//! BuildingParmetis
//!     ↓
//! BuildingSuperlu
//!     ↓
//! Done
//!
//! (Any non-terminal stage can transition to Aborted)
//! ```

use std::fmt;
use thiserror::Error;

use crate::dependency::Dependency;

/// Pipeline stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuildStage {
    /// Nothing has run yet
    NotStarted = 0,

    /// Checking arguments, configuration and the download directory
    Validating = 1,

    /// Cloning all four repositories
    Fetching = 2,

    /// `make config` + `make install` for GKlib
    BuildingGklib = 3,

    /// `make config` + `make install` for METIS
    BuildingMetis = 4,

    /// `make config cc=…` + `make install` for ParMETIS
    BuildingParmetis = 5,

    /// cmake build-tree generation + `make install` for superlu_dist
    BuildingSuperlu = 6,

    /// Everything installed (terminal state)
    Done = 7,

    /// A step failed (terminal state)
    Aborted = 255,
}

impl BuildStage {
    /// Returns the numeric order of this stage (0-7, 255 for Aborted)
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a terminal state (Done or Aborted)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Stage that builds the given dependency
    pub const fn building(dependency: Dependency) -> Self {
        match dependency {
            Dependency::Gklib => Self::BuildingGklib,
            Dependency::Metis => Self::BuildingMetis,
            Dependency::Parmetis => Self::BuildingParmetis,
            Dependency::SuperluDist => Self::BuildingSuperlu,
        }
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Validating),
            Self::Validating => Some(Self::Fetching),
            Self::Fetching => Some(Self::BuildingGklib),
            Self::BuildingGklib => Some(Self::BuildingMetis),
            Self::BuildingMetis => Some(Self::BuildingParmetis),
            Self::BuildingParmetis => Some(Self::BuildingSuperlu),
            Self::BuildingSuperlu => Some(Self::Done),
            Self::Done | Self::Aborted => None,
        }
    }

    /// Returns a human-readable description of this stage
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Validating => "Validating arguments",
            Self::Fetching => "Fetching sources",
            Self::BuildingGklib => "Building GKlib",
            Self::BuildingMetis => "Building METIS",
            Self::BuildingParmetis => "Building ParMETIS",
            Self::BuildingSuperlu => "Building superlu_dist",
            Self::Done => "Done",
            Self::Aborted => "Aborted",
        }
    }

    /// Returns all stages in order (excluding Aborted)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::Validating,
            Self::Fetching,
            Self::BuildingGklib,
            Self::BuildingMetis,
            Self::BuildingParmetis,
            Self::BuildingSuperlu,
            Self::Done,
        ]
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildTransitionError {
    /// Attempted to skip one or more stages
    #[error("Cannot skip from {from} to {to}")]
    SkippedStage { from: BuildStage, to: BuildStage },

    /// Attempted to go backwards
    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition { from: BuildStage, to: BuildStage },

    /// Attempted to transition from a terminal state
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: BuildStage },

    /// Attempted to transition to the same state
    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: BuildStage },
}

/// Tracks the stage of one run.
///
/// ```
/// use solver_deps::build_state::{BuildContext, BuildStage};
///
/// let mut ctx = BuildContext::new();
/// ctx.transition_to(BuildStage::Validating).unwrap();
/// assert_eq!(ctx.current_stage(), BuildStage::Validating);
///
/// // Cannot skip stages
/// assert!(ctx.transition_to(BuildStage::BuildingMetis).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BuildContext {
    current: BuildStage,

    /// Stage at which the run aborted (if any)
    aborted_at: Option<BuildStage>,

    /// Entered stages with unix timestamps
    stage_history: Vec<(BuildStage, u64)>,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext {
    /// Create a new context in the NotStarted state.
    pub fn new() -> Self {
        Self {
            current: BuildStage::NotStarted,
            aborted_at: None,
            stage_history: Vec::with_capacity(BuildStage::all_stages().len()),
        }
    }

    #[inline]
    pub fn current_stage(&self) -> BuildStage {
        self.current
    }

    /// Returns the stage at which the run aborted, if any
    #[inline]
    pub fn aborted_at(&self) -> Option<BuildStage> {
        self.aborted_at
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.current == BuildStage::Done
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.current == BuildStage::Aborted
    }

    /// Returns the stage history as a slice of (stage, timestamp) pairs
    pub fn stage_history(&self) -> &[(BuildStage, u64)] {
        &self.stage_history
    }

    /// Transition to a specific stage (must be the next stage in sequence).
    ///
    /// # Errors
    ///
    /// - `AlreadyAtStage` if target is the current stage
    /// - `BackwardTransition` if target is before current
    /// - `SkippedStage` if target is not the immediate next stage
    /// - `FromTerminalState` if current is a terminal state
    pub fn transition_to(&mut self, target: BuildStage) -> Result<BuildStage, BuildTransitionError> {
        if self.current.is_terminal() {
            return Err(BuildTransitionError::FromTerminalState { from: self.current });
        }

        if target == self.current {
            return Err(BuildTransitionError::AlreadyAtStage { stage: target });
        }

        // Aborting goes through abort()
        if target == BuildStage::Aborted {
            return Err(BuildTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.order() < self.current.order() {
            return Err(BuildTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }

        if self.current.next() != Some(target) {
            return Err(BuildTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        self.record_stage_transition(target);
        self.current = target;

        Ok(target)
    }

    /// Mark the run as aborted, remembering where.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if already at Done or Aborted
    pub fn abort(&mut self) -> Result<(), BuildTransitionError> {
        if self.current.is_terminal() {
            return Err(BuildTransitionError::FromTerminalState { from: self.current });
        }

        self.aborted_at = Some(self.current);
        self.record_stage_transition(BuildStage::Aborted);
        self.current = BuildStage::Aborted;

        Ok(())
    }

    fn record_stage_transition(&mut self, stage: BuildStage) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        tracing::debug!("Stage: {}", stage);
        self.stage_history.push((stage, timestamp));
    }
}

impl From<BuildTransitionError> for crate::error::SolverDepsError {
    fn from(err: BuildTransitionError) -> Self {
        crate::error::SolverDepsError::Transition(err.to_string())
    }
}
