// Helper functions are shared across multiple test crates; not every helper is
// referenced in each test module.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const ROOT_TOKEN: &str = "root-token";
pub(crate) const TOKEN_HEADER: &str = "X-Vault-Token";

pub(crate) fn write_token_file(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("vault-token");
    std::fs::write(&path, format!("  {ROOT_TOKEN}\n")).context("Failed to write token file")?;
    Ok(path)
}

pub(crate) fn seal_status_body(sealed: bool, progress: u32) -> Value {
    json!({
        "type": "shamir",
        "initialized": true,
        "sealed": sealed,
        "t": 3,
        "n": 5,
        "progress": progress,
    })
}

pub(crate) async fn stub_seal_status(server: &MockServer, sealed: bool, progress: u32) {
    Mock::given(method("GET"))
        .and(path("/v1/sys/seal-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(seal_status_body(sealed, progress)))
        .mount(server)
        .await;
}

/// Accepts `key` and answers with the given seal state, expecting exactly
/// `times` submissions.
pub(crate) async fn stub_unseal_key(
    server: &MockServer,
    key: &str,
    sealed: bool,
    progress: u32,
    times: u64,
) {
    Mock::given(method("POST"))
        .and(path("/v1/sys/unseal"))
        .and(body_json(json!({ "key": key })))
        .respond_with(ResponseTemplate::new(200).set_body_json(seal_status_body(sealed, progress)))
        .expect(times)
        .mount(server)
        .await;
}

pub(crate) async fn stub_unseal_rejected(server: &MockServer, key: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/sys/unseal"))
        .and(body_json(json!({ "key": key })))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({
                "errors": ["Error unsealing: invalid key"]
            })),
        )
        .expect(1)
        .mount(server)
        .await;
}

pub(crate) fn init_response_body() -> Value {
    json!({
        "keys": ["k1", "k2", "k3", "k4", "k5"],
        "keys_base64": ["b1", "b2", "b3", "b4", "b5"],
        "root_token": "s.generated-root",
    })
}

pub(crate) fn mount_list_body(paths: &[&str]) -> Value {
    let data: serde_json::Map<String, Value> = paths
        .iter()
        .map(|mount| (format!("{mount}/"), json!({ "type": mount })))
        .collect();
    json!({ "data": data })
}
