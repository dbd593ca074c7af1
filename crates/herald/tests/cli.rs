// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tests that run the compiled `herald` binary.

use std::path::Path;
use std::process::{Command, Output};

use herald_gateway::JwtVerifier;

fn herald(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_herald"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_config(dir: &tempfile::TempDir, toml: &str) -> std::path::PathBuf {
    let path = dir.path().join("herald.toml");
    std::fs::write(&path, toml).unwrap();
    path
}

#[test]
fn token_is_signed_with_configured_secret() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        "[auth]\njwt_secret = \"cli-secret\"\n\n[storage]\nbackend = \"memory\"\n",
    );
    let output = herald(&config, &["token", "--sub", "bob", "--days", "1"]);
    assert!(output.status.success(), "{output:?}");

    let token = String::from_utf8(output.stdout).unwrap();
    let now = chrono::Utc::now().timestamp();
    let claims = JwtVerifier::new("cli-secret", 0)
        .decode(token.trim(), now)
        .unwrap();
    assert_eq!(claims.sub, "bob");
}

#[test]
fn token_without_secret_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "[storage]\nbackend = \"memory\"\n");
    let output = herald(&config, &["token", "--sub", "bob"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("jwt_secret"), "{stderr}");
}

#[test]
fn check_config_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "[server]\nport = 4100\n");
    let output = herald(&config, &["check-config"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("4100"), "{stdout}");
}

#[test]
fn check_config_rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "[server]\nprot = 4100\n");
    let output = herald(&config, &["check-config"]);
    assert!(!output.status.success());
}
