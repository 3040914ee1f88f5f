//! Test: secret references bind for one stage and are released after it

use crate::helpers::*;
use stageline::ExecutionEvent;
use std::path::PathBuf;

#[tokio::test]
async fn test_username_password_bound_for_one_stage() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: migrate
    environment:
      DB_PASS: secret://store/usernamePassword/db-cred
    steps:
      - id: migrate-db
        properties:
          db.user: ${DB_PASS_USR}
          db.password: ${DB_PASS_PSW}
  - name: report
    steps:
      - id: summary
        properties:
          db.password: ${DB_PASS_PSW}
"#,
    );

    let (result, run) = h.run_with_context(&p, "").await;
    assert!(result.unwrap());

    let migrate = h.tool.call("migrate-db");
    assert_eq!(migrate.properties.get("db.user"), Some(&"admin".to_string()));
    assert_eq!(migrate.properties.get("db.password"), Some(&"hunter2".to_string()));
    assert_eq!(migrate.environment.get("DB_PASS_PSW"), Some(&"hunter2".to_string()));
    assert!(!migrate.environment.contains_key("DB_PASS"));
    assert!(migrate.live_secrets.contains(&"hunter2".to_string()));

    // Next stage no longer sees the secret
    let summary = h.tool.call("summary");
    assert_eq!(
        summary.properties.get("db.password"),
        Some(&"${DB_PASS_PSW}".to_string())
    );
    assert!(!summary.environment.contains_key("DB_PASS_PSW"));
    assert!(summary.live_secrets.is_empty());

    // Registry entry gone, property file holding the password removed
    assert!(h.registry.secrets_for(run.run_id).is_empty());
    assert!(!run.environment.contains_key("DB_PASS_USR"));
    assert!(!migrate.property_file.exists());
    assert!(summary.property_file.exists());
    assert_eq!(h.stage_result("migrate"), Some((true, 1)));
}

#[tokio::test]
async fn test_file_and_ssh_material_removed_after_stage() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: deploy
    environment:
      KUBECONFIG: secret://store/FileBinding/kubeconfig
      GIT: secret://store/sshUserPrivateKey/deploy-key
    steps:
      - id: apply
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    let apply = h.tool.call("apply");
    let kubeconfig = PathBuf::from(apply.environment.get("KUBECONFIG").unwrap());
    let key_file = PathBuf::from(apply.environment.get("GIT_KEYFILE").unwrap());

    assert!(kubeconfig.starts_with(h.workspace.secrets_dir()));
    assert_eq!(kubeconfig.file_name().unwrap(), "config");
    assert_eq!(apply.environment.get("GIT_USER"), Some(&"git".to_string()));
    assert_eq!(
        apply.environment.get("GIT_KEYPASSWORD"),
        Some(&"open-sesame".to_string())
    );

    assert!(!kubeconfig.exists());
    assert!(!key_file.exists());
    assert!(files_in(&h.workspace.secrets_dir()).is_empty());
    assert_eq!(h.stage_result("deploy"), Some((true, 2)));
}

#[tokio::test]
async fn test_each_stage_unbinds_exactly_once() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: first
    environment:
      TOKEN: secret://store/string/api-token
    steps:
      - id: one
  - name: second
    environment:
      TOKEN: secret://store/StringBinding/api-token
    steps:
      - id: two
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    assert_eq!(h.counter.binds(), 2);
    assert_eq!(h.counter.unbinds(), 2);
    assert_eq!(
        h.tool.call("two").environment.get("TOKEN"),
        Some(&"tok-123".to_string())
    );
}

#[tokio::test]
async fn test_unbind_runs_when_step_fails() {
    let h = Harness::with_tool(RecordingTool::new().failing(&["publish"]));
    let p = pipeline(
        r#"
stages:
  - name: release
    environment:
      TOKEN: secret://store/string/api-token
    steps:
      - id: publish
      - id: announce
"#,
    );

    assert!(!h.run(&p, "").await.unwrap());

    assert_eq!(h.tool.executed_ids(), vec!["publish"]);
    assert_eq!(h.counter.binds(), 1);
    assert_eq!(h.counter.unbinds(), 1);
    assert!(h.registry.active_runs().is_empty());
}

#[tokio::test]
async fn test_binding_error_fails_stage_and_releases_partial_bindings() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: deploy
    environment:
      A_TOKEN: secret://store/string/api-token
      B_CERT: secret://store/certificate/ca
    steps:
      - id: apply
    after_steps:
      - id: cleanup
  - name: verify
    steps:
      - id: smoke
"#,
    );

    assert!(!h.run(&p, "").await.unwrap());

    assert!(h.tool.executed_ids().is_empty());
    assert_eq!(h.counter.binds(), 1);
    assert_eq!(h.counter.unbinds(), 1);
    assert_eq!(h.stage_result("deploy"), Some((false, 1)));
    assert_eq!(h.started_stages(), vec!["deploy"]);
}

#[tokio::test]
async fn test_missing_secret_fails_stage() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: deploy
    environment:
      DB: secret://store/usernamePassword/no-such-cred
    steps:
      - id: apply
"#,
    );

    assert!(!h.run(&p, "").await.unwrap());
    assert!(h.tool.executed_ids().is_empty());
}

#[tokio::test]
async fn test_malformed_reference_stays_literal() {
    let h = Harness::new();
    let p = pipeline(
        r#"
stages:
  - name: build
    environment:
      NOTE: secret://store/string
      OTHER: secret://vault/string/x
    steps:
      - id: compile
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    let compile = h.tool.call("compile");
    assert_eq!(
        compile.environment.get("NOTE"),
        Some(&"secret://store/string".to_string())
    );
    assert_eq!(
        compile.environment.get("OTHER"),
        Some(&"secret://vault/string/x".to_string())
    );
    assert_eq!(h.counter.binds(), 0);
}

#[tokio::test]
async fn test_tool_output_is_redacted() {
    let h = Harness::with_tool(RecordingTool::new().printing("connecting as admin with hunter2"));
    let p = pipeline(
        r#"
stages:
  - name: migrate
    environment:
      DB: secret://store/usernamePassword/db-cred
    steps:
      - id: migrate-db
  - name: after
    steps:
      - id: plain
"#,
    );

    assert!(h.run(&p, "").await.unwrap());

    let lines: Vec<(String, String)> = h
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ExecutionEvent::StepOutput { step_id, line } => Some((step_id, line)),
            _ => None,
        })
        .collect();

    assert_eq!(
        lines,
        vec![
            ("migrate-db".to_string(), "connecting as **** with ****".to_string()),
            // Nothing live any more, so nothing to mask
            ("plain".to_string(), "connecting as admin with hunter2".to_string()),
        ]
    );
}
