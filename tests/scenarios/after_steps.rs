//! Test: after-steps always run and never mask an earlier failure

use crate::helpers::*;

const WITH_CLEANUP: &str = r#"
stages:
  - name: integration
    environment:
      TOKEN: secret://store/string/api-token
    steps:
      - id: start-db
      - id: run-tests
      - id: report
    after_steps:
      - id: stop-db
      - id: archive
  - name: publish
    steps:
      - id: upload
"#;

#[tokio::test]
async fn test_after_steps_run_after_success() {
    let h = Harness::new();
    assert!(h.run(&pipeline(WITH_CLEANUP), "").await.unwrap());

    assert_eq!(
        h.tool.executed_ids(),
        vec!["start-db", "run-tests", "report", "stop-db", "archive", "upload"]
    );
}

#[tokio::test]
async fn test_main_failure_not_masked_by_after_steps() {
    let h = Harness::with_tool(RecordingTool::new().failing(&["run-tests"]));
    assert!(!h.run(&pipeline(WITH_CLEANUP), "").await.unwrap());

    // report skipped, cleanup still ran, publish never started
    assert_eq!(
        h.tool.executed_ids(),
        vec!["start-db", "run-tests", "stop-db", "archive"]
    );
    assert_eq!(h.stage_result("integration"), Some((false, 1)));
    assert_eq!(h.counter.unbinds(), 1);
}

#[tokio::test]
async fn test_after_step_failure_fails_stage() {
    let h = Harness::with_tool(RecordingTool::new().failing(&["stop-db"]));
    assert!(!h.run(&pipeline(WITH_CLEANUP), "").await.unwrap());

    // after-steps short-circuit too
    assert_eq!(
        h.tool.executed_ids(),
        vec!["start-db", "run-tests", "report", "stop-db"]
    );
    assert_eq!(h.stage_result("integration"), Some((false, 1)));
    assert_eq!(h.stage_result("publish"), None);
}

#[tokio::test]
async fn test_after_steps_see_stage_secrets() {
    let h = Harness::new();
    assert!(h.run(&pipeline(WITH_CLEANUP), "").await.unwrap());

    let archive = h.tool.call("archive");
    assert_eq!(archive.environment.get("TOKEN"), Some(&"tok-123".to_string()));
    assert!(archive.live_secrets.contains(&"tok-123".to_string()));
    assert!(!h.tool.call("upload").environment.contains_key("TOKEN"));
}
