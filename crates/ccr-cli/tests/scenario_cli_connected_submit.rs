//! CONNECTED mode end to end against a mock back office: the directory is
//! fetched over HTTP, and the finished reconciliation is submitted.

use assert_cmd::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::process::Command;

const COUNTER: &str = "\
H;20;50;100;200;500;1000;2000;10000
D;SN-9;999;01/03/2024;09:00;0;0;0;0;0;2;0;0;0;0;0;0;0;0;0;0
";

const SHEET: &str = "Machine,Amount\n7,2000\n";

fn config_yaml(base_url: &str, token_env: &str) -> String {
    format!(
        "api:\n  base_url: \"{base_url}\"\n  credentials_env:\n    token: \"{token_env}\"\noperator:\n  name: night-shift\n"
    )
}

#[test]
fn connected_reconcile_fetches_directory_and_submits() -> anyhow::Result<()> {
    let server = MockServer::start();
    let machines = server.mock(|when, then| {
        when.method(GET)
            .path("/machines")
            .header("authorization", "Bearer tok-cli");
        then.status(200)
            .json_body(json!({"7": {"serialNumber": "SN-9", "zone": "ESTE"}}));
    });
    let submit = server.mock(|when, then| {
        when.method(POST)
            .path("/reconciliations")
            .header("authorization", "Bearer tok-cli")
            .body_contains("\"performedBy\":\"night-shift\"")
            .body_contains("\"zone\":\"ESTE\"");
        then.status(201).json_body(json!({
            "id": "rec-1",
            "submissionId": "6f1c1f1e-3c55-4bb0-9a43-4f0b7e1f2a10",
            "acceptedAt": "2024-03-01T19:00:00Z"
        }));
    });

    let dir = tempfile::tempdir()?;
    let counter = dir.path().join("counter.txt");
    let sheet = dir.path().join("expected.csv");
    let cfg = dir.path().join("site.yaml");
    fs::write(&counter, COUNTER)?;
    fs::write(&sheet, SHEET)?;
    fs::write(&cfg, config_yaml(&server.base_url(), "CCR_CLI_TEST_TOKEN"))?;

    let out = Command::cargo_bin("ccr")?
        .env("CCR_CLI_TEST_TOKEN", "tok-cli")
        .env("RUST_LOG", "warn")
        .args(["reconcile", "--submit", "--zone", "ESTE"])
        .arg("--counter")
        .arg(&counter)
        .arg("--sheet")
        .arg(&sheet)
        .arg("--config")
        .arg(&cfg)
        .output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    machines.assert();
    submit.assert();

    let v: Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(v["receipt"]["id"], "rec-1");
    assert_eq!(v["summary"]["match"], 1);
    // The counter serial resolved to machine 7 through the fetched directory.
    assert_eq!(v["results"][0]["machineId"], "7");
    assert_eq!(v["results"][0]["zone"], "ESTE");
    Ok(())
}

#[test]
fn rejected_submission_fails_the_command() -> anyhow::Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/machines");
        then.status(200).json_body(json!({}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/reconciliations");
        then.status(409).json_body(json!({"message": "collection already closed"}));
    });

    let dir = tempfile::tempdir()?;
    let counter = dir.path().join("counter.txt");
    let sheet = dir.path().join("expected.csv");
    let cfg = dir.path().join("site.yaml");
    fs::write(&counter, COUNTER)?;
    fs::write(&sheet, SHEET)?;
    fs::write(&cfg, config_yaml(&server.base_url(), "CCR_CLI_TEST_TOKEN_409"))?;

    Command::cargo_bin("ccr")?
        .env("CCR_CLI_TEST_TOKEN_409", "tok-cli")
        .args(["reconcile", "--submit"])
        .arg("--counter")
        .arg(&counter)
        .arg("--sheet")
        .arg(&sheet)
        .arg("--config")
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("submit reconciliation failed"))
        .stderr(predicate::str::contains("status=409"));
    Ok(())
}

#[test]
fn report_download_writes_bytes() -> anyhow::Result<()> {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/reports/discrepancies")
            .query_param("date", "2024-03-01");
        then.status(200).body("machine,difference\n7,0\n");
    });

    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("site.yaml");
    let out_file = dir.path().join("report.csv");
    fs::write(&cfg, config_yaml(&server.base_url(), "CCR_CLI_TEST_TOKEN_RPT"))?;

    Command::cargo_bin("ccr")?
        .env("CCR_CLI_TEST_TOKEN_RPT", "tok-cli")
        .args(["report", "--kind", "discrepancies", "--date", "2024-03-01"])
        .arg("--config")
        .arg(&cfg)
        .arg("--out")
        .arg(&out_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("report_written=true"));

    m.assert();
    assert_eq!(fs::read_to_string(&out_file)?, "machine,difference\n7,0\n");
    Ok(())
}
