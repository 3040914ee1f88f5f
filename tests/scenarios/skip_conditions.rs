//! Test: skipped stages succeed without running steps but still unbind

use crate::helpers::*;
use stageline::ExecutionEvent;

#[tokio::test]
async fn test_skipped_stage_succeeds_and_releases_secrets() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: deploy
    skip: true
    environment:
      TOKEN: secret://store/string/api-token
    steps:
      - id: apply
    after_steps:
      - id: cleanup
  - name: verify
    steps:
      - id: smoke
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    assert_eq!(h.tool.executed_ids(), vec!["smoke"]);
    assert_eq!(h.counter.binds(), 1);
    assert_eq!(h.counter.unbinds(), 1);
    assert_eq!(h.stage_result("deploy"), Some((true, 1)));
    assert!(h
        .events()
        .contains(&ExecutionEvent::StageSkipped { stage: "deploy".to_string() }));
}

#[tokio::test]
async fn test_skip_rule_sees_merged_environment() {
    let h = Harness::new();
    let p = pipeline(
        r#"
environment:
  BRANCH: feature/login
stages:
  - name: publish
    skip:
      var: BRANCH
      matches: "^feature/"
      use_regex: true
    steps:
      - id: upload
  - name: docs
    environment:
      SKIP_DOCS: "true"
    skip:
      var: SKIP_DOCS
      equals: "true"
    steps:
      - id: build-docs
  - name: test
    skip:
      var: NOT_SET
    steps:
      - id: unit
"#,
    );

    assert!(h.run(&p, "").await.unwrap());
    assert_eq!(h.tool.executed_ids(), vec!["unit"]);
}

#[tokio::test]
async fn test_skip_false_runs_stage() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: build
    skip: false
    steps:
      - id: compile
"#,
    );

    assert!(h.run(&p, "").await.unwrap());
    assert_eq!(h.tool.executed_ids(), vec!["compile"]);
}
