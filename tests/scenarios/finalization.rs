//! Test: finalization runs exactly once, and its failure fails the run

use crate::helpers::*;
use edaflow::core::{RunStatus, StartPoint};
use edaflow::execution::{PipelineError, PipelineEvent};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_finalize_runs_once_after_the_last_step() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    let recorded = calls(&log);
    assert_eq!(
        recorded.iter().filter(|c| **c == FlowCall::Finalize).count(),
        1
    );
    assert_eq!(recorded.last(), Some(&FlowCall::Finalize));
}

#[tokio::test]
async fn test_tool_failure_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);
    flow.fail_finalize = true;

    let result = pipeline.run(&mut flow, StartPoint::Beginning).await;

    assert!(matches!(result, Err(PipelineError::ExternalProcess(_))));
    assert_eq!(pipeline.status(), RunStatus::Failed);

    // Aliases are only created after a successful finalization.
    assert!(!dir.path().join("post_A").exists());
}

#[tokio::test]
async fn test_event_sequence_over_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    pipeline.add_event_handler(move |event| {
        let tag = match event {
            PipelineEvent::RunStarted { .. } => "start".to_string(),
            PipelineEvent::CheckpointRestored { step } => format!("restore:{}", step),
            PipelineEvent::StepStarted { step, .. } => format!("step:{}", step),
            PipelineEvent::StepCompleted { step } => format!("done:{}", step),
            PipelineEvent::CheckpointPersisted { step } => format!("ckpt:{}", step),
            PipelineEvent::Finalizing => "finalizing".to_string(),
            PipelineEvent::RunCompleted { .. } => "end".to_string(),
        };
        sink.lock().unwrap().push(tag);
    });

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "start", "step:A", "done:A", "ckpt:B", "step:B", "done:B", "ckpt:C", "step:C",
            "done:C", "finalizing", "end"
        ]
    );
}

#[tokio::test]
async fn test_single_step_flow_has_no_checkpoints_and_still_finalizes() {
    use edaflow::core::{NoCheckpoints, Step};
    use edaflow::execution::StepPipeline;

    fn only(flow: &mut TestFlow) -> anyhow::Result<()> {
        flow.script.append("solo");
        Ok(())
    }

    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = StepPipeline::new(
        vec![Step::new("only", only)],
        Box::new(NoCheckpoints),
        dir.path().to_path_buf(),
    )
    .unwrap();
    let mut flow = TestFlow::new(&log);

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    assert_eq!(pipeline.status(), RunStatus::Done);
    assert!(pipeline.transitions().is_empty());
    assert_eq!(calls(&log), vec![FlowCall::Finalize]);
    assert_eq!(flow.script.lines(), &["solo"]);
}
