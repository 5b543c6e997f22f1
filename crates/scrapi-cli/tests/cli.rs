#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENTRIES: &str = "/archivist/v1/publicscitt/entries";
const OPERATIONS: &str = "/archivist/v1/publicscitt/operations";

/// `scrapi` with no SCRAPI_* settings leaking in from the environment.
fn scrapi() -> Command {
    let mut cmd = Command::cargo_bin("scrapi").unwrap();
    for var in [
        "SCRAPI_ENGINE",
        "SCRAPI_URL",
        "SCRAPI_CLIENT_ID",
        "SCRAPI_CLIENT_SECRET",
        "SCRAPI_TOKEN",
        "SCRAPI_LOG_LEVEL",
        "SCRAPI_TIMEOUT",
        "SCRAPI_MAX_RETRIES",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_subcommands() {
    scrapi()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("statement"))
        .stdout(predicate::str::contains("--engine"));
}

#[test]
fn unknown_engine_is_a_setup_error() {
    scrapi()
        .args(["--engine", "Rekor", "status", "op-1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown engine type: Rekor"));
}

#[test]
fn invalid_url_is_a_setup_error() {
    scrapi()
        .args(["--url", "ftp://example.com", "status", "op-1"])
        .assert()
        .code(1);
}

#[test]
fn config_is_not_supported_on_datatrails() {
    scrapi()
        .arg("config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn missing_statement_file_is_internal_error() {
    let dir = tempdir().unwrap();
    scrapi()
        .arg("submit")
        .arg(dir.path().join("nope.cbor"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read statement"));
}

#[test]
fn zero_poll_interval_is_rejected() {
    scrapi()
        .args(["register", "statement.cbor", "--interval", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--interval"));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_prints_operation_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/op-1", OPERATIONS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "operationID": "op-1",
            "status": "succeeded",
            "entryID": "entry-1"
        })))
        .mount(&mock_server)
        .await;

    scrapi()
        .args(["--url", mock_server.uri().as_str(), "--token", "t", "status", "op-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"succeeded\""))
        .stdout(predicate::str::contains("\"entryID\": \"entry-1\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn register_writes_receipt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "operationID": "op-9",
            "status": "running"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/op-9", OPERATIONS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "operationID": "op-9",
            "status": "succeeded",
            "entryID": "entry-9"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/entry-9/receipt", ENTRIES)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xd2, 0x84, 0x40]))
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let statement = dir.path().join("statement.cbor");
    let receipt = dir.path().join("receipt.cbor");
    std::fs::write(&statement, [0xd2, 0x84]).unwrap();

    scrapi()
        .args(["--url", mock_server.uri().as_str(), "--token", "t", "register"])
        .arg(&statement)
        .arg("--receipt-out")
        .arg(&receipt)
        .args(["--interval", "1", "--timeout", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entry-9"));

    assert_eq!(std::fs::read(&receipt).unwrap(), vec![0xd2, 0x84, 0x40]);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_registration_exits_with_service_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "operationID": "op-bad",
            "status": "failed"
        })))
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let statement = dir.path().join("statement.cbor");
    std::fs::write(&statement, [0xd2, 0x84]).unwrap();

    scrapi()
        .args(["--url", mock_server.uri().as_str(), "--token", "t", "submit"])
        .arg(&statement)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("op-bad"));
}
