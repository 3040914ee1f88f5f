//! Test: interruption fails the stage, skips the rest and still unbinds

use crate::helpers::*;

const INTERRUPTIBLE: &str = r#"
stages:
  - name: long
    environment:
      TOKEN: secret://store/string/api-token
      KUBECONFIG: secret://store/file/kubeconfig
    steps:
      - id: wait
      - id: never
    after_steps:
      - id: cleanup
  - name: later
    steps:
      - id: later-step
"#;

#[tokio::test]
async fn test_interrupt_during_step_releases_secrets() {
    let h = Harness::interrupted_on("wait");
    let (result, run) = h.run_with_context(&pipeline(INTERRUPTIBLE), "").await;

    assert!(!result.unwrap());
    assert_eq!(h.tool.executed_ids(), vec!["wait"]);
    assert_eq!(h.counter.binds(), 1);
    assert_eq!(h.counter.unbinds(), 1);
    assert_eq!(h.stage_result("long"), Some((false, 2)));
    assert_eq!(h.started_stages(), vec!["long"]);

    assert!(h.registry.secrets_for(run.run_id).is_empty());
    assert!(files_in(&h.workspace.secrets_dir()).is_empty());
    assert!(!run.environment.contains_key("TOKEN"));
}

#[tokio::test]
async fn test_interrupt_before_run_binds_nothing() {
    let h = Harness::new();
    h.engine.interrupt_handle().trigger();

    let result = h.run(&pipeline(INTERRUPTIBLE), "").await.unwrap();

    assert!(!result);
    assert!(h.tool.executed_ids().is_empty());
    assert_eq!(h.counter.binds(), 0);
    assert_eq!(h.stage_result("long"), Some((false, 0)));
}

#[tokio::test]
async fn test_host_timeout_leaves_no_secret_on_disk() {
    let h = Harness::with_tool(RecordingTool::new().hanging_on("hang"));
    let p = pipeline(
        r#"
stages:
  - name: migrate
    environment:
      DB_PASS: secret://store/usernamePassword/db-cred
      KUBECONFIG: secret://store/file/kubeconfig
    steps:
      - id: hang
        properties:
          db.password: ${DB_PASS_PSW}
"#,
    );

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(200),
        h.run(&p, ""),
    )
    .await;

    assert!(timed_out.is_err());
    assert_eq!(h.tool.executed_ids(), vec!["hang"]);

    let property_files: Vec<String> = files_in(&h.workspace.ci_dir())
        .into_iter()
        .filter(|name| name.ends_with(".properties"))
        .collect();
    assert!(property_files.is_empty(), "left behind: {:?}", property_files);
    assert!(files_in(&h.workspace.secrets_dir()).is_empty());
    assert!(h.registry.active_runs().is_empty());
}
