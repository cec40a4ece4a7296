//! Test: fail-fast semantics on step action failure

use crate::helpers::*;
use edaflow::core::{RunStatus, StartPoint, Transition};
use edaflow::execution::PipelineError;

#[tokio::test]
async fn test_failed_step_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);
    flow.fail_on = Some("B");

    let result = pipeline.run(&mut flow, StartPoint::Beginning).await;

    assert!(matches!(
        result,
        Err(PipelineError::StepAction { ref step, .. }) if step == "B"
    ));
    assert_eq!(pipeline.status(), RunStatus::Failed);

    // C never runs, no checkpoint for C is written, finalization never runs.
    assert_eq!(actions(&log), vec!["A", "B"]);
    assert!(!calls(&log).contains(&FlowCall::Persist("C".to_string())));
    assert!(!calls(&log).contains(&FlowCall::Finalize));
}

#[tokio::test]
async fn test_buffer_keeps_partial_output_of_the_failing_step() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);
    flow.fail_on = Some("B");

    let _ = pipeline.run(&mut flow, StartPoint::Beginning).await;

    // B appended its command before failing; nothing from C.
    assert_eq!(flow.script.lines(), &["cmd_A", "cmd_B"]);
}

#[tokio::test]
async fn test_failed_run_keeps_earlier_checkpoints_as_resume_targets() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);
    flow.fail_on = Some("B");

    let _ = pipeline.run(&mut flow, StartPoint::Beginning).await;

    // The checkpoint for B (written after A succeeded) is still recorded,
    // so a future run can start at B by name.
    assert!(calls(&log).contains(&FlowCall::Persist("B".to_string())));
}

#[tokio::test]
async fn test_failure_on_first_step_runs_nothing_else() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);
    flow.fail_on = Some("A");

    let result = pipeline.run(&mut flow, StartPoint::Beginning).await;

    assert!(result.is_err());
    assert_eq!(actions(&log), vec!["A"]);
    assert!(pipeline.transitions().is_empty());
    assert!(!calls(&log).iter().any(|c| matches!(c, FlowCall::Persist(_))));
}

#[tokio::test]
async fn test_no_aliases_after_a_failed_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);
    flow.fail_on = Some("C");

    let _ = pipeline.run(&mut flow, StartPoint::Beginning).await;

    // Boundaries were crossed, but alias creation only happens after a
    // successful finalization.
    assert_eq!(
        pipeline.transitions(),
        &[Transition::new("A", "B"), Transition::new("B", "C")]
    );
    assert!(!dir.path().join("post_A").exists());
    assert!(!dir.path().join("post_B").exists());
}
