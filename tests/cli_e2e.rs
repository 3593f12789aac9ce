//! End-to-end CLI tests for the rest-guard binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

mod support;

use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use support::socket_guard::start_mock_server_or_skip;
use support::{ALPHABET, ALPHABET_MD5, UNREACHABLE};

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resilient HTTP request"));
}

#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rest-guard"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_get_without_nodes_fails() {
    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.args(["get", "/index"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no nodes given"));
}

#[test]
fn test_missing_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.arg("--config")
        .arg(temp_dir.path().join("absent.json"))
        .args(["get", "--service", "svc", "/index"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid guard definition"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_get_prints_body_after_failover() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("all good"))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.args(["-q", "get", "--node", UNREACHABLE, "--node"])
        .arg(server.address().to_string())
        .args(["--retries", "1", "/status"])
        .assert()
        .success()
        .stdout("all good");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_get_rejected_exits_non_zero() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.args(["-q", "get", "--node"])
        .arg(server.address().to_string())
        .arg("/status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("503"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_download_prints_artifact_json() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/alphabet.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(ALPHABET.to_vec()))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("alphabet.txt");

    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.args(["-q", "download", "--node"])
        .arg(server.address().to_string())
        .arg("--output")
        .arg(&output)
        .arg("/alphabet.txt")
        .assert()
        .success()
        .stdout(predicate::str::contains(ALPHABET_MD5))
        .stdout(predicate::str::contains("\"size\": 26"));

    assert_eq!(std::fs::read(&output).unwrap(), ALPHABET);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_download_deadline_leaves_no_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(ALPHABET.to_vec())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("slow.bin");

    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.args(["-q", "download", "--node"])
        .arg(server.address().to_string())
        .args(["--timeout", "1", "--output"])
        .arg(&output)
        .arg("/slow")
        .assert()
        .failure()
        .stderr(predicate::str::contains("deadline of 1s exceeded"));

    assert!(!output.exists(), "partial file must be removed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_service_from_config_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("from config"))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("guard.json");
    let definition = serde_json::json!({
        "config": {"reqs_timeout": 5},
        "services": [{
            "name": "svc",
            "retries": 1,
            "nodes": [
                {"name": "down", "base_url": UNREACHABLE},
                {"name": "up", "base_url": server.address().to_string()}
            ]
        }]
    });
    std::fs::write(&config, definition.to_string()).unwrap();

    let mut cmd = Command::cargo_bin("rest-guard").unwrap();
    cmd.arg("-q")
        .arg("--config")
        .arg(&config)
        .args(["get", "--service", "svc", "/anything"])
        .assert()
        .success()
        .stdout("from config");
}
