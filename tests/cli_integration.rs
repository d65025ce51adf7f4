//! CLI integration tests
//!
//! Runs the `acres-scout` binary end to end for the offline subcommands.

mod common;

use acres_scout::token::Token;
use acres_scout::token::crypto::md5_hex;
use assert_cmd::cargo::cargo_bin_cmd;
use common::*;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("scrape"))
        .stdout(predicate::str::contains("regenerate"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_scrape_help_flags() {
    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.args(["scrape", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--target"));
}

#[test]
fn test_regenerate_prints_signed_token() {
    let url = "https://www.example.com/api-aggregator/srp/search?page=2&page_size=25";
    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.args(["regenerate", "--token", &bootstrap_token(), "--url", url]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let token = Token::parse(stdout.trim()).unwrap();
    assert!(token.verify(SECRET).unwrap());

    let claims = token.claims().unwrap();
    assert_eq!(claims.hq, md5_hex(&format!("{SALT1}page=2&page_size=25{SALT2}")));
    assert_eq!(claims.s1.as_deref(), Some(SALT1));
}

#[test]
fn test_regenerate_with_body_adds_body_hash() {
    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.args([
        "regenerate",
        "--token",
        &bootstrap_token(),
        "--url",
        "https://www.example.com/api",
        "--body",
        "{}",
    ]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let token = Token::parse(String::from_utf8(output.stdout).unwrap().trim()).unwrap();
    assert!(token.claims().unwrap().hb.is_some());
}

#[test]
fn test_regenerate_rejects_malformed_token() {
    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.args(["regenerate", "--token", "not-a-token", "--url", "https://x/api?a=1"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Malformed token"));
}

#[test]
fn test_inspect_masks_secret() {
    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.args(["inspect", "--token", &bootstrap_token()]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["header"]["typ"], "JWT");
    assert_eq!(json["payload"]["s1"], SALT1);
    assert_eq!(json["payload"]["s3"], "***");
    assert_eq!(json["payload"]["exp"].as_f64().unwrap() - json["payload"]["iat"].as_f64().unwrap(), 120.0);
}

#[test]
fn test_scrape_without_targets_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "[fetch]\nmax_pages = 3\n").unwrap();

    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.args(["scrape", "--config"])
        .arg(&config)
        .arg("--output")
        .arg(temp_dir.path().join("out.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No targets"));

    assert!(!temp_dir.path().join("out.json").exists());
}

#[test]
fn test_scrape_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "[fetch]\nbatch_size = 0\n").unwrap();

    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.args(["scrape", "--config"]).arg(&config);

    cmd.assert().failure();
}

#[test]
fn test_scrape_logs_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("acres-scout");
    cmd.env_remove("RUST_LOG")
        .args(["scrape", "--config"])
        .arg(temp_dir.path().join("absent.toml"))
        .arg("--output")
        .arg(temp_dir.path().join("out.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("No targets"));
}
