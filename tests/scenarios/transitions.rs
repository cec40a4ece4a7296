//! Test: transition history and checkpoint aliases

use crate::helpers::*;
use edaflow::core::{StartPoint, Transition};

#[tokio::test]
async fn test_full_run_records_every_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    // len(steps) - index(start) - 1 boundaries for a complete run.
    assert_eq!(
        pipeline.transitions(),
        &[Transition::new("A", "B"), Transition::new("B", "C")]
    );
}

#[tokio::test]
async fn test_checkpoints_are_write_ahead_named() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    // The checkpoint after each step carries the *next* step's name, and is
    // written before that step's action runs.
    assert_eq!(
        calls(&log),
        vec![
            FlowCall::Action("A".to_string()),
            FlowCall::Persist("B".to_string()),
            FlowCall::Action("B".to_string()),
            FlowCall::Persist("C".to_string()),
            FlowCall::Action("C".to_string()),
            FlowCall::Finalize,
        ]
    );
}

#[tokio::test]
async fn test_no_checkpoint_after_the_last_step() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    let persists: Vec<_> = calls(&log)
        .into_iter()
        .filter(|c| matches!(c, FlowCall::Persist(_)))
        .collect();
    assert_eq!(persists.len(), 2);
}

#[tokio::test]
async fn test_resumed_run_skips_uncrossed_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline
        .run(&mut flow, StartPoint::At("C".to_string()))
        .await
        .unwrap();

    assert!(pipeline.transitions().is_empty());
}

#[tokio::test]
async fn test_aliases_link_post_to_pre() {
    let dir = tempfile::tempdir().unwrap();
    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    pipeline.run(&mut flow, StartPoint::Beginning).await.unwrap();

    let post_a = dir.path().join("post_A");
    let post_b = dir.path().join("post_B");
    assert_eq!(std::fs::read_link(&post_a).unwrap().to_str(), Some("pre_B"));
    assert_eq!(std::fs::read_link(&post_b).unwrap().to_str(), Some("pre_C"));
    assert!(!dir.path().join("post_C").exists());
}

#[tokio::test]
async fn test_alias_collision_is_only_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    // Occupy one alias name ahead of time; symlink creation will fail.
    std::fs::write(dir.path().join("post_A"), "occupied").unwrap();

    let log = new_call_log();
    let mut pipeline = abc_pipeline(dir.path(), &log);
    let mut flow = TestFlow::new(&log);

    let result = pipeline.run(&mut flow, StartPoint::Beginning).await;

    assert!(result.is_ok());
    // The other alias is still created.
    assert_eq!(std::fs::read_link(dir.path().join("post_B")).unwrap().to_str(), Some("pre_C"));
}
