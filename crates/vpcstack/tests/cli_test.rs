#![allow(deprecated)] // TODO: move from Command::cargo_bin to the cargo_bin_cmd! macro

use assert_cmd::Command;
use predicates::prelude::*;
mod common;
use common::TestProject;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("vpcstack").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("diff"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("vpcstack").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpcstack"));
}

#[test]
fn test_synth_help() {
    let mut cmd = Command::cargo_bin("vpcstack").unwrap();
    cmd.arg("synth")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--key-pair"))
        .stdout(predicate::str::contains("--out"))
        .stdout(predicate::str::contains("--stdout"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("vpcstack").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_validate_without_key_warns() {
    let project = TestProject::new();
    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("warning"))
        .stdout(predicate::str::contains("no key pair"))
        .stdout(predicate::str::contains("Resources: 9"));
}

#[test]
fn test_validate_require_key_pair_fails() {
    let project = TestProject::new();
    project
        .command()
        .arg("validate")
        .arg("--require-key-pair")
        .assert()
        .failure()
        .stdout(predicate::str::contains("error"));
}

#[test]
fn test_validate_with_env_key() {
    let project = TestProject::new();
    project
        .command()
        .env("key_pair_file_name", "env-key")
        .arg("validate")
        .arg("--require-key-pair")
        .assert()
        .success()
        .stdout(predicate::str::contains("key: env-key"));
}

#[test]
fn test_key_pair_flag_beats_env_and_settings() {
    let project = TestProject::new();
    project.write_stack_kdl(
        r#"
stack "CdkVpcStack" {
    key-pair "settings-key"
}
"#,
    );

    project
        .command()
        .env("key_pair_file_name", "env-key")
        .arg("validate")
        .arg("--key-pair")
        .arg("flag-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("key: flag-key"))
        .stdout(predicate::str::contains("env-key").not());

    project
        .command()
        .env("key_pair_file_name", "env-key")
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("key: env-key"));

    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("key: settings-key"));
}

#[test]
fn test_invalid_key_pair_rejected() {
    let project = TestProject::new();
    project
        .command()
        .arg("validate")
        .arg("--key-pair")
        .arg("bad\nkey")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid key pair name"));
}

#[test]
fn test_blank_key_pair_flag_rejected() {
    let project = TestProject::new();
    project
        .command()
        .env("key_pair_file_name", "env-key")
        .arg("validate")
        .arg("--key-pair")
        .arg(" ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid key pair name"));
}

#[test]
fn test_graph_prints_creation_order() {
    let project = TestProject::new();
    project
        .command()
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. cdk-vpc"))
        .stdout(predicate::str::contains("VPC-SG --permits--> VPC-Priv-SG"))
        .stdout(predicate::str::contains(
            "private-subnet-1-az1 --placed-in--> PrivateInstance",
        ));
}

#[test]
fn test_invalid_settings_file_fails() {
    let project = TestProject::new();
    project.write_stack_kdl("stack \"\" {}");

    project
        .command()
        .arg("graph")
        .assert()
        .failure()
        .stderr(predicate::str::contains("stack.kdl"));
}

#[test]
fn test_explicit_config_must_exist() {
    let project = TestProject::new();
    project
        .command()
        .arg("--config")
        .arg("missing.kdl")
        .arg("graph")
        .assert()
        .failure();
}
