//! Test: explicit stage selection keeps request order and rejects unknown names

use crate::helpers::*;
use stageline::PipelineError;

const THREE_STAGES: &str = r#"
stages:
  - name: A
    steps:
      - id: a
  - name: B
    steps:
      - id: b
  - name: C
    steps:
      - id: c
"#;

#[tokio::test]
async fn test_selection_runs_in_requested_order() {
    let h = Harness::new();
    let result = h.run(&pipeline(THREE_STAGES), "C,A").await.unwrap();

    assert!(result);
    assert_eq!(h.started_stages(), vec!["C", "A"]);
    assert_eq!(h.tool.executed_ids(), vec!["c", "a"]);
}

#[tokio::test]
async fn test_unknown_stage_aborts_before_anything_runs() {
    let h = Harness::new();
    let err = h.run(&pipeline(THREE_STAGES), "A,D").await.unwrap_err();

    assert!(matches!(err, PipelineError::StageNotFound(ref name) if name == "D"));
    assert!(h.tool.executed_ids().is_empty());
    assert!(h.events().is_empty());
}

#[tokio::test]
async fn test_selection_with_whitespace() {
    let h = Harness::new();
    assert!(h.run(&pipeline(THREE_STAGES), " B , C ").await.unwrap());
    assert_eq!(h.tool.executed_ids(), vec!["b", "c"]);
}

#[tokio::test]
async fn test_failure_stops_selected_run() {
    let h = Harness::with_tool(RecordingTool::new().failing(&["c"]));
    let result = h.run(&pipeline(THREE_STAGES), "C,A").await.unwrap();

    assert!(!result);
    assert_eq!(h.tool.executed_ids(), vec!["c"]);
}
