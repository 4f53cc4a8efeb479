//! Integration tests for the edge-deploy binary
//!
//! Runs the compiled CLI in a scratch directory and checks exit codes and
//! the resulting nginx config.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CONF: &str = "http {\n    upstream backend {\n    }\n}\n";

fn edge_deploy(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_edge-deploy"))
        .args(args)
        .current_dir(cwd)
        .env_remove("EDGE_DEPLOY_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run edge-deploy")
}

/// Write nginx.conf and a descriptor whose commands only append to calls.log
fn scratch(instances: &[(&str, u16)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("nginx.conf"), CONF).unwrap();

    let log = dir.path().join("calls.log");
    let mut descriptor = String::from("instances:\n");
    for (title, port) in instances {
        descriptor.push_str(&format!("  - title: {}\n    port: {}\n", title, port));
    }
    descriptor.push_str(&format!(
        "\
nginxConfPath: nginx.conf
waitStopTime: 0
proxyBinary: sh
reloadCommand: echo reload >> {log}
startCommand: echo proxy-start >> {log}
backendStartCommand: echo start {{title}} {{port}} {{args}} >> {log}
backendStopCommand: echo stop {{title}} >> {log}
",
        log = log.display()
    ));
    std::fs::write(dir.path().join(".deploy.yml"), descriptor).unwrap();
    dir
}

fn calls(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("calls.log")).unwrap_or_default()
}

#[test]
fn test_start_rolls_all_instances() {
    let dir = scratch(&[("api-1", 7001), ("api-2", 7002)]);

    let out = edge_deploy(dir.path(), &["start", "--daemon"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(
        calls(&dir),
        "reload\nreload\nstop api-1\nstart api-1 7001 --daemon\nreload\n\
         reload\nstop api-2\nstart api-2 7002 --daemon\nreload\n"
    );
    let conf = std::fs::read_to_string(dir.path().join("nginx.conf")).unwrap();
    assert!(conf.contains("server localhost:7001;"));
    assert!(conf.contains("server localhost:7002;"));
}

#[test]
fn test_stop_runs_stop_commands() {
    let dir = scratch(&[("api-1", 7001), ("api-2", 7002)]);

    let out = edge_deploy(dir.path(), &["stop"]);
    assert!(out.status.success());
    assert_eq!(calls(&dir), "stop api-1\nstop api-2\n");
}

#[test]
fn test_backends_prints_json() {
    let dir = scratch(&[("api-1", 7001), ("api-2", 7002)]);
    std::fs::write(
        dir.path().join("nginx.conf"),
        "upstream backend {\n    server localhost:7001;\n    server localhost:7002 down;\n}\n",
    )
    .unwrap();

    let out = edge_deploy(dir.path(), &["backends"]);
    assert!(out.status.success());

    let backends: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        backends,
        serde_json::json!([
            {"address": "localhost:7001", "enabled": true},
            {"address": "localhost:7002", "enabled": false},
        ])
    );
}

#[test]
fn test_explicit_descriptor_path() {
    let dir = scratch(&[("api-1", 7001), ("api-2", 7002)]);
    let elsewhere = TempDir::new().unwrap();
    let descriptor = dir.path().join(".deploy.yml");

    let out = edge_deploy(
        elsewhere.path(),
        &["-f", descriptor.to_str().unwrap(), "stop"],
    );
    assert!(out.status.success());
    assert_eq!(calls(&dir), "stop api-1\nstop api-2\n");
}

#[test]
fn test_descriptor_from_environment() {
    let dir = scratch(&[("api-1", 7001), ("api-2", 7002)]);
    let elsewhere = TempDir::new().unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_edge-deploy"))
        .arg("stop")
        .current_dir(elsewhere.path())
        .env("EDGE_DEPLOY_CONFIG", dir.path().join(".deploy.yml"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run edge-deploy");
    assert!(out.status.success());
    assert_eq!(calls(&dir), "stop api-1\nstop api-2\n");
}

#[test]
fn test_unknown_subcommand_exits_1() {
    let dir = scratch(&[("api-1", 7001), ("api-2", 7002)]);
    let out = edge_deploy(dir.path(), &["restart"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_help_exits_0() {
    let dir = TempDir::new().unwrap();
    let out = edge_deploy(dir.path(), &["--help"]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn test_missing_descriptor_exits_1() {
    let dir = TempDir::new().unwrap();
    let out = edge_deploy(dir.path(), &["start"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains(".deploy.yml not found"));
}

#[test]
fn test_single_instance_exits_1_without_side_effects() {
    let dir = scratch(&[("api-1", 7001)]);
    let out = edge_deploy(dir.path(), &["start"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("at least two instances"));
    assert_eq!(calls(&dir), "");
    assert_eq!(std::fs::read_to_string(dir.path().join("nginx.conf")).unwrap(), CONF);
}

#[test]
fn test_failed_backend_start_exits_1() {
    let dir = scratch(&[("api-1", 7001), ("api-2", 7002)]);
    let descriptor = std::fs::read_to_string(dir.path().join(".deploy.yml")).unwrap();
    let descriptor = descriptor.replace("backendStartCommand: echo", "backendStartCommand: false &&");
    std::fs::write(dir.path().join(".deploy.yml"), descriptor).unwrap();

    let out = edge_deploy(dir.path(), &["start"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("start instance api-1 failed"));
    assert!(!calls(&dir).contains("stop api-2"));
}
