//! Test: stages run in config order and stop at the first failure

use crate::helpers::*;

const THREE_STAGES: &str = r#"
name: ordered
stages:
  - name: A
    steps:
      - id: a1
  - name: B
    steps:
      - id: b1
      - id: b2
  - name: C
    steps:
      - id: c1
"#;

#[tokio::test]
async fn test_all_stages_in_config_order() {
    let h = Harness::new();
    let result = h.run(&pipeline(THREE_STAGES), "").await.unwrap();

    assert!(result);
    assert_eq!(h.started_stages(), vec!["A", "B", "C"]);
    assert_eq!(h.tool.executed_ids(), vec!["a1", "b1", "b2", "c1"]);
}

#[tokio::test]
async fn test_failure_in_b_halts_before_c() {
    let h = Harness::with_tool(RecordingTool::new().failing(&["b1"]));
    let result = h.run(&pipeline(THREE_STAGES), "").await.unwrap();

    assert!(!result);
    assert_eq!(h.started_stages(), vec!["A", "B"]);
    // b2 short-circuited, C never started
    assert_eq!(h.tool.executed_ids(), vec!["a1", "b1"]);
    assert_eq!(h.stage_result("A"), Some((true, 0)));
    assert_eq!(h.stage_result("B"), Some((false, 0)));
    assert_eq!(h.stage_result("C"), None);
}

#[tokio::test]
async fn test_stage_without_steps_succeeds() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: empty
  - name: next
    steps:
      - id: n1
"#,
    );

    assert!(h.run(&p, "").await.unwrap());
    assert_eq!(h.tool.executed_ids(), vec!["n1"]);
}

#[tokio::test]
async fn test_pipeline_without_stages_is_failure() {
    let h = Harness::new();
    let p = pipeline("name: nothing\n");

    assert!(!h.run(&p, "").await.unwrap());
    assert!(h.tool.executed_ids().is_empty());
}

#[tokio::test]
async fn test_each_step_gets_its_own_property_file() {
    let h = Harness::new();
    let p = pipeline(
        r#"
environment:
  TARGET: release
stages:
  - name: build
    steps:
      - id: compile
        properties:
          profile: ${TARGET}
          threads: 4
      - id: package
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    let compile = h.tool.call("compile");
    let package = h.tool.call("package");
    assert_ne!(compile.property_file, package.property_file);
    assert!(compile.property_file.starts_with(h.workspace.ci_dir()));

    assert_eq!(compile.properties.get("profile"), Some(&"release".to_string()));
    assert_eq!(compile.properties.get("threads"), Some(&"4".to_string()));
    assert_eq!(compile.properties.get("step.id"), Some(&"compile".to_string()));
    assert_eq!(
        compile.properties.get("ws.dir"),
        Some(&h.workspace.root().to_string_lossy().into_owned())
    );
    assert_eq!(compile.environment.get("TARGET"), Some(&"release".to_string()));
    assert!(!package.properties.contains_key("profile"));
}

#[tokio::test]
async fn test_run_properties_override_step_properties() {
    let h = Harness::new();
    std::fs::create_dir_all(h.workspace.ci_dir()).unwrap();
    std::fs::write(
        h.workspace.run_properties_path(),
        "# job overrides\nprofile = debug\nbuild.number: 42\n",
    )
    .unwrap();

    let p = pipeline(
        r#"
stages:
  - name: build
    steps:
      - id: compile
        properties:
          profile: release
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    let compile = h.tool.call("compile");
    assert_eq!(compile.properties.get("profile"), Some(&"debug".to_string()));
    assert_eq!(compile.properties.get("build.number"), Some(&"42".to_string()));
}

#[tokio::test]
async fn test_literal_stage_environment_visible_to_later_stages() {
    let h = Harness::new();
    let p = pipeline(
        r#"
environment:
  REGION: us
stages:
  - name: first
    environment:
      REGION: eu
      TIER: gold
    steps:
      - id: one
  - name: second
    steps:
      - id: two
  - name: third
    environment:
      TIER: silver
    steps:
      - id: three
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    let two = h.tool.call("two");
    assert_eq!(two.environment.get("REGION"), Some(&"eu".to_string()));
    assert_eq!(two.environment.get("TIER"), Some(&"gold".to_string()));
    assert_eq!(
        h.tool.call("three").environment.get("TIER"),
        Some(&"silver".to_string())
    );
}
