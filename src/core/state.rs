//! Run state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a pipeline run.
///
/// `Running → Running` transitions happen once per step boundary and each
/// one persists a checkpoint; `Finalizing` is entered only after the last
/// step succeeds. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started.
    NotStarted,
    /// A step action is executing (or about to).
    Running,
    /// All steps succeeded; the flushed script is being handed to the tool.
    Finalizing,
    /// Finalization succeeded.
    Done,
    /// A step action, checkpoint restore, or the tool invocation failed.
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }
}

/// One step boundary crossed during a run.
///
/// Recorded only for boundaries actually crossed: a run resumed mid-flow has
/// no records for the boundaries it skipped. After finalization each record
/// becomes a `post_{prev}` checkpoint alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub prev: String,
    pub next: String,
}

impl Transition {
    pub fn new(prev: &str, next: &str) -> Self {
        Self { prev: prev.to_string(), next: next.to_string() }
    }
}

/// Bookkeeping for a single run, the source data for run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID.
    pub run_id: Uuid,

    /// Current status.
    pub status: RunStatus,

    /// When the run started.
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,

    /// Steps in the flow (not just in this run's span).
    pub total_steps: usize,

    /// Step actions that succeeded in this run.
    pub completed_steps: usize,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::NotStarted,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
        }
    }

    pub fn start(&mut self, total_steps: usize) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
        self.completed_steps = 0;
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Done;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
