//! End-to-end tests of the `qseed` binary.
//!
//! Each run gets an empty home directory and no IBM credentials, so every
//! seed comes from the local simulator.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use num_bigint::BigUint;

fn qseed(home: &Path, args: &[&str]) -> Output {
    qseed_with_env(home, args, &[])
}

fn qseed_with_env(home: &Path, args: &[&str], vars: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_qseed"));
    command
        .env("HOME", home)
        .env_remove("IBM_QUANTUM_TOKEN")
        .env_remove("IBM_API_KEY")
        .env_remove("IBM_SERVICE_CRN")
        .env_remove("QSEED_CONFIG")
        .env_remove("QSEED_QUBITS")
        .env_remove("QSEED_SHOTS")
        .env_remove("QSEED_SIMULATE")
        .env_remove("RUST_LOG")
        .env_remove("QSEED_MAX_QUBITS")
        .env_remove("QSEED_TIMEOUT_SECS")
        .envs(vars.iter().copied())
        .args(args)
        .output()
        .expect("failed to launch qseed")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_seed_json_on_simulator() {
    let home = tempfile::tempdir().unwrap();
    let output = qseed(
        home.path(),
        &["seed", "--qubits", "4", "--shots", "128", "--sim-seed", "5", "--format", "json"],
    );
    assert!(output.status.success(), "{output:?}");

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["backend"], "simulator");
    assert_eq!(report["simulated"], true);
    assert_eq!(report["fallback"], "no_token");
    assert_eq!(report["qubits"], 4);
    assert_eq!(report["shots"], 128);

    let counts = report["counts"].as_object().unwrap();
    let total: u64 = counts.values().map(|v| v.as_u64().unwrap()).sum();
    assert_eq!(total, 128);
    assert!(counts.keys().all(|k| k.len() == 4));

    // serde_json keeps object keys sorted, matching the fold order.
    let digits: String = counts.values().map(|v| v.to_string()).collect();
    let expected = BigUint::parse_bytes(digits.as_bytes(), 16).unwrap();
    assert_eq!(report["seed"].as_str().unwrap(), expected.to_string());
}

#[test]
fn test_seed_is_repeatable_with_sim_seed() {
    let home = tempfile::tempdir().unwrap();
    let args = ["seed", "-q", "3", "-s", "64", "--sim-seed", "42", "-f", "json"];
    let a: serde_json::Value = serde_json::from_slice(&qseed(home.path(), &args).stdout).unwrap();
    let b: serde_json::Value = serde_json::from_slice(&qseed(home.path(), &args).stdout).unwrap();
    assert_eq!(a["seed"], b["seed"]);
}

#[test]
fn test_seed_text_output() {
    let home = tempfile::tempdir().unwrap();
    let output = qseed(home.path(), &["seed", "-q", "2", "-s", "32", "--draw"]);
    assert!(output.status.success(), "{output:?}");

    let text = stdout(&output);
    assert!(text.contains("Seed:"));
    assert!(text.contains("Most probable:"));
    assert!(text.contains("q[1]"));
}

#[test]
fn test_config_file_is_used() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("seed.yaml");
    fs::write(&path, "qubits: 3\nshots: 16\nsimulator:\n  seed: 1\n").unwrap();

    let output = qseed(
        home.path(),
        &["seed", "--config", path.to_str().unwrap(), "--format", "json"],
    );
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["qubits"], 3);
    assert_eq!(report["shots"], 16);
}

#[test]
fn test_flags_override_invalid_file_and_env_values() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("seed.yaml");
    fs::write(&path, "qubits: 0\nshots: 16\n").unwrap();

    let output = qseed(
        home.path(),
        &["seed", "--config", path.to_str().unwrap(), "--qubits", "5", "-f", "json"],
    );
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["qubits"], 5);
    assert_eq!(report["shots"], 16);

    let output = qseed_with_env(
        home.path(),
        &["seed", "--qubits", "3", "--shots", "8", "-f", "json"],
        &[("QSEED_QUBITS", "0")],
    );
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["qubits"], 3);
}

#[test]
fn test_invalid_shots_fail() {
    let home = tempfile::tempdir().unwrap();
    let output = qseed(home.path(), &["seed", "--shots", "0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_draw_with_qasm() {
    let home = tempfile::tempdir().unwrap();
    let output = qseed(home.path(), &["draw", "--qubits", "3", "--qasm"]);
    assert!(output.status.success(), "{output:?}");

    let text = stdout(&output);
    assert!(text.contains("quantumseed"));
    assert!(text.contains("[H]"));
    assert!(text.contains("OPENQASM 3"));
    assert!(text.contains("cx q[0], q[1];"));
}

#[test]
fn test_backends_without_credentials() {
    let home = tempfile::tempdir().unwrap();
    let output = qseed(home.path(), &["backends"]);
    assert!(output.status.success(), "{output:?}");

    let text = stdout(&output);
    assert!(text.contains("simulator"));
    assert!(text.contains("not configured"));
}

#[test]
fn test_version() {
    let home = tempfile::tempdir().unwrap();
    let output = qseed(home.path(), &["version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}
