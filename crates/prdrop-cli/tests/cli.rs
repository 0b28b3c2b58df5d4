//! Smoke tests of the `prdrop` binary.

#![allow(
    clippy::indexing_slicing,
    clippy::unwrap_used,
    reason = "Test code - relax these lints for clarity"
)]

use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use test_utils::{WALLET, dkim_witness_json, merged_notification};

fn prdrop(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("prdrop").unwrap();
    cmd.current_dir(dir).env("RUST_LOG", "warn");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn schema_describes_claim_request() {
    let dir = tempfile::tempdir().unwrap();
    let output = prdrop(dir.path()).arg("schema").output().unwrap();
    assert!(output.status.success());

    let schema = stdout_json(&output);
    assert!(schema["properties"]["publicInputs"].is_object());
    assert!(schema["properties"]["proof"].is_object());
}

#[test]
fn email_extract_prints_fields() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("email.eml"), merged_notification()).unwrap();

    let output = prdrop(dir.path())
        .args(["email", "extract"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let extraction = stdout_json(&output);
    assert_eq!(extraction["fields"]["repo_name"], "acme/widgets");
    assert_eq!(extraction["fields"]["pr_number"], "42");
    assert_eq!(extraction["misses"], Value::Array(vec![]));
}

#[test]
fn claim_workflow_verifies_offline() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("email.eml"), merged_notification()).unwrap();
    std::fs::write(dir.path().join("dkim.json"), dkim_witness_json(21)).unwrap();
    std::fs::write(
        dir.path().join("circuit.json"),
        r#"{ "bytecode": "claim-circuit", "abi": null }"#,
    )
    .unwrap();

    prdrop(dir.path())
        .args(["inputs", "build", "--wallet", WALLET, "--out", "inputs.json"])
        .assert()
        .success();
    prdrop(dir.path())
        .args(["setup", "digest"])
        .assert()
        .success();
    prdrop(dir.path())
        .args(["prove", "--out", "claim-request.json"])
        .assert()
        .success();
    prdrop(dir.path()).arg("verify").assert().success();

    let request: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("claim-request.json")).unwrap())
            .unwrap();
    assert_eq!(request["publicInputs"].as_array().map(Vec::len), Some(53));
}

#[test]
fn missing_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    prdrop(dir.path())
        .args(["verify", "--request", "absent.json"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn serve_without_ledger_choice_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    prdrop(dir.path()).arg("serve").assert().failure().code(2);
}

#[test]
fn serve_refuses_digest_backend_without_trial_flag() {
    let dir = tempfile::tempdir().unwrap();
    let output = prdrop(dir.path())
        .args(["serve", "--memory-ledger"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--allow-digest-backend"));
}
