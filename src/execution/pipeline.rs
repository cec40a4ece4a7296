//! Step pipeline - ordered execution with checkpoint/restart

use crate::core::{CheckpointError, CheckpointIo, RunState, RunStatus, StartPoint, Step, Transition};
use crate::execution::runner::RunnerError;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("flow has no steps")]
    EmptyFlow,

    #[error("duplicate step name `{0}`")]
    DuplicateStep(String),

    #[error("no step named `{0}` in this flow")]
    UnknownStep(String),

    #[error("step `{step}` failed")]
    StepAction {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not restore checkpoint for `{step}`")]
    CheckpointRestore {
        step: String,
        #[source]
        source: CheckpointError,
    },

    #[error("could not persist checkpoint for `{step}`")]
    CheckpointPersist {
        step: String,
        #[source]
        source: CheckpointError,
    },

    #[error("tool invocation failed")]
    ExternalProcess(#[from] RunnerError),

    #[error("expected output artifact missing: {0}")]
    MissingArtifact(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Terminal action of a flow: flush the accumulated script and hand it to
/// the wrapped tool. Runs exactly once, after the last step succeeds.
#[async_trait]
pub trait Finalize {
    async fn finalize(&mut self) -> Result<(), PipelineError>;
}

/// Events emitted as a run advances, for progress display.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted { start_step: String, total: usize },
    CheckpointRestored { step: String },
    StepStarted { step: String, index: usize, total: usize },
    StepCompleted { step: String },
    CheckpointPersisted { step: String },
    Finalizing,
    RunCompleted { status: RunStatus },
}

pub type EventHandler = Box<dyn Fn(&PipelineEvent) + Send>;

/// Executes an ordered list of named steps exactly once each, in order,
/// with restart capability.
///
/// A run can begin at any step name; when it does not begin at the first
/// step, the checkpoint collaborator rehydrates tool-side state first.
/// After every successful non-terminal step a checkpoint named for the
/// *next* step is persisted, so a later run can resume exactly where a
/// failed one stopped. Failure of any step aborts the run at that boundary;
/// checkpoints already written stay on disk as resume targets.
pub struct StepPipeline<S> {
    steps: Vec<Step<S>>,
    checkpoints: Box<dyn CheckpointIo<S>>,
    run_dir: PathBuf,
    transitions: Vec<Transition>,
    run: RunState,
    handlers: Vec<EventHandler>,
}

impl<S> StepPipeline<S> {
    pub fn new(
        steps: Vec<Step<S>>,
        checkpoints: Box<dyn CheckpointIo<S>>,
        run_dir: PathBuf,
    ) -> Result<Self, PipelineError> {
        if steps.is_empty() {
            return Err(PipelineError::EmptyFlow);
        }
        let mut seen = std::collections::HashSet::new();
        for step in &steps {
            if !seen.insert(step.name().to_string()) {
                return Err(PipelineError::DuplicateStep(step.name().to_string()));
            }
        }

        Ok(Self {
            steps,
            checkpoints,
            run_dir,
            transitions: Vec::new(),
            run: RunState::new(),
            handlers: Vec::new(),
        })
    }

    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&PipelineEvent) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    fn emit(&self, event: PipelineEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn status(&self) -> RunStatus {
        self.run.status
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    /// Step boundaries crossed by the most recent run.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    fn resolve_start(&self, start: &StartPoint) -> Result<usize, PipelineError> {
        match start {
            StartPoint::Beginning => Ok(0),
            StartPoint::At(name) => self
                .steps
                .iter()
                .position(|s| s.name() == name.as_str())
                .ok_or_else(|| PipelineError::UnknownStep(name.clone())),
        }
    }

    /// Run the flow from `start` through finalization.
    ///
    /// Fail-fast: the first failing step action aborts the run with no
    /// checkpoint persisted for it and nothing after it executed, including
    /// finalization. Only checkpoint-alias creation is non-fatal.
    pub async fn run(&mut self, state: &mut S, start: StartPoint) -> Result<(), PipelineError>
    where
        S: Finalize + Send,
    {
        let start_idx = self.resolve_start(&start)?;
        let total = self.steps.len();

        self.transitions.clear();
        self.run.start(total);
        self.emit(PipelineEvent::RunStarted {
            start_step: self.steps[start_idx].name().to_string(),
            total,
        });

        // Resuming mid-flow: rehydrate tool state before the first action.
        if start_idx > 0 {
            let name = self.steps[start_idx].name().to_string();
            info!("resuming from step `{}`", name);
            self.checkpoints.restore(state, &name).map_err(|e| {
                self.run.fail();
                PipelineError::CheckpointRestore { step: name.clone(), source: e }
            })?;
            self.emit(PipelineEvent::CheckpointRestored { step: name });
        }

        for i in start_idx..total {
            let name = self.steps[i].name().to_string();
            self.emit(PipelineEvent::StepStarted { step: name.clone(), index: i, total });
            info!("running step `{}` ({}/{})", name, i + 1, total);

            if let Err(e) = self.steps[i].run(state) {
                self.run.fail();
                self.emit(PipelineEvent::RunCompleted { status: RunStatus::Failed });
                return Err(PipelineError::StepAction { step: name, source: e });
            }
            self.run.completed_steps += 1;
            self.emit(PipelineEvent::StepCompleted { step: name.clone() });

            // Write-ahead checkpoint for the step we are about to enter.
            if i + 1 < total {
                let next = self.steps[i + 1].name().to_string();
                self.checkpoints.persist(state, &next).map_err(|e| {
                    self.run.fail();
                    PipelineError::CheckpointPersist { step: next.clone(), source: e }
                })?;
                self.emit(PipelineEvent::CheckpointPersisted { step: next.clone() });
                self.transitions.push(Transition::new(&name, &next));
            }
        }

        self.run.status = RunStatus::Finalizing;
        self.emit(PipelineEvent::Finalizing);
        if let Err(e) = state.finalize().await {
            self.run.fail();
            self.emit(PipelineEvent::RunCompleted { status: RunStatus::Failed });
            return Err(e);
        }

        self.create_checkpoint_aliases();

        self.run.complete();
        self.emit(PipelineEvent::RunCompleted { status: RunStatus::Done });
        Ok(())
    }

    /// Link `post_{prev}` to `pre_{next}` for every boundary this run
    /// crossed. The two names refer to the same saved state; the aliases
    /// exist so a browsable run directory reads either way. Failures here
    /// never fail the run.
    fn create_checkpoint_aliases(&self) {
        for t in &self.transitions {
            let link = self.run_dir.join(format!("post_{}", t.prev));
            let target = format!("pre_{}", t.next);
            if let Err(e) = std::os::unix::fs::symlink(&target, &link) {
                warn!("could not create checkpoint alias {} -> {}: {}", link.display(), target, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NoCheckpoints;

    struct NullFlow;

    #[async_trait]
    impl Finalize for NullFlow {
        async fn finalize(&mut self) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    fn noop(_state: &mut NullFlow) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_new_rejects_empty_flow() {
        let result = StepPipeline::<NullFlow>::new(vec![], Box::new(NoCheckpoints), PathBuf::from("."));
        assert!(matches!(result, Err(PipelineError::EmptyFlow)));
    }

    #[test]
    fn test_new_rejects_duplicate_step_names() {
        let steps = vec![Step::new("init", noop), Step::new("init", noop)];
        let result = StepPipeline::new(steps, Box::new(NoCheckpoints), PathBuf::from("."));
        assert!(matches!(result, Err(PipelineError::DuplicateStep(name)) if name == "init"));
    }

    #[test]
    fn test_unknown_start_step_is_rejected() {
        let steps = vec![Step::new("init", noop)];
        let pipeline = StepPipeline::new(steps, Box::new(NoCheckpoints), PathBuf::from(".")).unwrap();
        let result = pipeline.resolve_start(&StartPoint::At("bogus".to_string()));
        assert!(matches!(result, Err(PipelineError::UnknownStep(name)) if name == "bogus"));
    }
}
