//! Test: resume behavior - checkpoint restore happens iff not starting first

use crate::helpers::*;
use edaflow::core::{RunStatus, StartPoint, Transition};
use edaflow::execution::{PipelineError, StepPipeline};

#[tokio::test]
async fn test_start_at_first_step_does_not_restore() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    assert!(!calls(&log).iter().any(|c| matches!(c, FlowCall::Restore(_))));
    assert_eq!(actions(&log), vec!["A", "B", "C"]);
    assert_eq!(pipeline.status(), RunStatus::Done);
}

#[tokio::test]
async fn test_start_at_named_first_step_does_not_restore() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline
        .run(&mut flow, StartPoint::At("A".to_string()))
        .await
        .unwrap();

    assert!(!calls(&log).iter().any(|c| matches!(c, FlowCall::Restore(_))));
    assert_eq!(actions(&log), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_resume_at_b_restores_b_and_skips_a() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline
        .run(&mut flow, StartPoint::At("B".to_string()))
        .await
        .unwrap();

    // Restore happens exactly once, before any action.
    let recorded = calls(&log);
    assert_eq!(recorded[0], FlowCall::Restore("B".to_string()));
    assert_eq!(
        recorded.iter().filter(|c| matches!(c, FlowCall::Restore(_))).count(),
        1
    );
    assert_eq!(actions(&log), vec!["B", "C"]);
    assert_eq!(pipeline.transitions(), &[Transition::new("B", "C")]);
}

#[tokio::test]
async fn test_unknown_start_step_is_fatal_before_any_action() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    let result = pipeline
        .run(&mut flow, StartPoint::At("Z".to_string()))
        .await;

    assert!(matches!(result, Err(PipelineError::UnknownStep(name)) if name == "Z"));
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn test_restore_failure_prevents_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = StepPipeline::new(
        abc_steps(),
        Box::new(RecordingCheckpoints::failing_restore(&log)),
        dir.path().to_path_buf(),
    )
    .unwrap();
    let mut flow = TestFlow::new(&log);

    let result = pipeline
        .run(&mut flow, StartPoint::At("B".to_string()))
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::CheckpointRestore { step, .. }) if step == "B"
    ));
    assert!(actions(&log).is_empty());
    assert_eq!(pipeline.status(), RunStatus::Failed);
}
