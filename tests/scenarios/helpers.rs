//! Test doubles and builders for pipeline scenarios

use edaflow::core::{CheckpointError, CheckpointIo, ScriptBuffer, Step};
use edaflow::execution::{Finalize, PipelineError, RunnerError, StepPipeline};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Everything the doubles observe, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowCall {
    Action(String),
    Restore(String),
    Persist(String),
    Finalize,
}

pub type CallLog = Arc<Mutex<Vec<FlowCall>>>;

pub fn new_call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<FlowCall> {
    log.lock().unwrap().clone()
}

/// Flow double: each step appends one command to the buffer and records
/// itself. A step named in `fail_on` appends first, then fails, so partial
/// output survives in the buffer.
pub struct TestFlow {
    pub script: ScriptBuffer,
    pub log: CallLog,
    pub fail_on: Option<&'static str>,
    pub fail_finalize: bool,
}

impl TestFlow {
    pub fn new(log: &CallLog) -> Self {
        Self {
            script: ScriptBuffer::new(),
            log: log.clone(),
            fail_on: None,
            fail_finalize: false,
        }
    }

    fn touch(&mut self, name: &'static str) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(FlowCall::Action(name.to_string()));
        self.script.append(format!("cmd_{}", name));
        if self.fail_on == Some(name) {
            anyhow::bail!("step {} was told to fail", name);
        }
        Ok(())
    }
}

fn action_a(flow: &mut TestFlow) -> anyhow::Result<()> {
    flow.touch("A")
}

fn action_b(flow: &mut TestFlow) -> anyhow::Result<()> {
    flow.touch("B")
}

fn action_c(flow: &mut TestFlow) -> anyhow::Result<()> {
    flow.touch("C")
}

#[async_trait]
impl Finalize for TestFlow {
    async fn finalize(&mut self) -> Result<(), PipelineError> {
        self.log.lock().unwrap().push(FlowCall::Finalize);
        if self.fail_finalize {
            return Err(PipelineError::ExternalProcess(RunnerError::NonZeroExit {
                bin: "fake-tool".to_string(),
                code: 1,
                stderr: "boom".to_string(),
            }));
        }
        Ok(())
    }
}

/// Checkpoint double that records calls instead of emitting commands.
pub struct RecordingCheckpoints {
    log: CallLog,
    fail_restore: bool,
}

impl RecordingCheckpoints {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone(), fail_restore: false }
    }

    pub fn failing_restore(log: &CallLog) -> Self {
        Self { log: log.clone(), fail_restore: true }
    }
}

impl CheckpointIo<TestFlow> for RecordingCheckpoints {
    fn restore(&self, _state: &mut TestFlow, step: &str) -> Result<(), CheckpointError> {
        if self.fail_restore {
            return Err(CheckpointError::Unsupported { step: step.to_string() });
        }
        self.log.lock().unwrap().push(FlowCall::Restore(step.to_string()));
        Ok(())
    }

    fn persist(&self, _state: &mut TestFlow, step: &str) -> Result<(), CheckpointError> {
        self.log.lock().unwrap().push(FlowCall::Persist(step.to_string()));
        Ok(())
    }
}

pub fn abc_steps() -> Vec<Step<TestFlow>> {
    vec![
        Step::new("A", action_a),
        Step::new("B", action_b),
        Step::new("C", action_c),
    ]
}

pub fn abc_pipeline(run_dir: &Path, log: &CallLog) -> StepPipeline<TestFlow> {
    StepPipeline::new(
        abc_steps(),
        Box::new(RecordingCheckpoints::new(log)),
        run_dir.to_path_buf(),
    )
    .unwrap()
}

/// Just the step actions that ran, in order.
pub fn actions(log: &CallLog) -> Vec<String> {
    calls(log)
        .into_iter()
        .filter_map(|c| match c {
            FlowCall::Action(name) => Some(name),
            _ => None,
        })
        .collect()
}
