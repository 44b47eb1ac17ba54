use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::baseline::{AuthBackend, SecretsMount};
use crate::error::ClientError;

const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Control-plane operations the bootstrap phases need from a secret store.
///
/// Every call goes straight to the remote service: nothing is cached and
/// nothing is retried.
#[allow(async_fn_in_trait)]
pub trait SecretStore {
    /// Reads the current seal state.
    async fn seal_status(&self) -> Result<SealStatus, ClientError>;

    /// Initializes the store, splitting the root key into `shares` pieces.
    ///
    /// Fails if the store reports that it is already initialized.
    async fn init(&self, shares: u8, threshold: u8) -> Result<InitResponse, ClientError>;

    /// Submits one key share and returns the resulting seal state.
    async fn unseal(&self, key: &str) -> Result<SealStatus, ClientError>;

    /// Creates or replaces an ACL policy.
    async fn write_policy(&self, name: &str, rules: &str) -> Result<(), ClientError>;

    /// Lists mounted auth method paths, without the trailing slash.
    async fn list_auth_backends(&self) -> Result<BTreeSet<String>, ClientError>;

    async fn enable_auth_backend(&self, backend: &AuthBackend) -> Result<(), ClientError>;

    /// Writes `data` to the logical path made of `path` segments.
    ///
    /// Each segment is percent-encoded, so a segment never spills into the
    /// next one or into the query string.
    async fn write_secret(
        &self,
        path: &[&str],
        data: &serde_json::Value,
    ) -> Result<(), ClientError>;

    /// Lists mounted secrets engine paths, without the trailing slash.
    async fn list_secret_mounts(&self) -> Result<BTreeSet<String>, ClientError>;

    async fn enable_secrets_engine(&self, mount: &SecretsMount) -> Result<(), ClientError>;
}

#[derive(Debug, Clone)]
pub struct VaultClient {
    base_url: Url,
    client: Client,
    token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SealStatus {
    pub sealed: bool,
    #[serde(default)]
    pub initialized: Option<bool>,
    /// Number of shares required to unseal.
    #[serde(default)]
    pub t: u32,
    /// Number of shares the root key was split into.
    #[serde(default)]
    pub n: u32,
    /// Shares accepted so far in the current unseal attempt.
    #[serde(default)]
    pub progress: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitResponse {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub keys_base64: Vec<String>,
    pub root_token: String,
}

#[derive(Debug, Deserialize)]
struct MountListResponse {
    data: BTreeMap<String, serde_json::Value>,
}

impl MountListResponse {
    fn into_names(self) -> BTreeSet<String> {
        self.data
            .into_keys()
            .map(|key| key.trim_end_matches('/').to_string())
            .collect()
    }
}

impl VaultClient {
    /// Creates an unauthenticated client for the store at `address`.
    ///
    /// # Errors
    /// Returns an error if `address` is not an http(s) URL or the HTTP client
    /// cannot be built.
    pub fn new(address: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(address).map_err(|err| ClientError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidAddress {
                address: address.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        let client = Client::builder().build().map_err(ClientError::Build)?;
        Ok(Self {
            base_url: parsed,
            client,
            token: None,
        })
    }

    /// Creates a client authenticated with the token stored in `token_file`.
    ///
    /// An empty path, or a file holding only whitespace, yields an
    /// unauthenticated client.
    ///
    /// # Errors
    /// Returns an error if the address is invalid or the token file cannot be
    /// read.
    pub fn with_token_file(address: &str, token_file: &Path) -> Result<Self, ClientError> {
        let mut client = Self::new(address)?;
        if token_file.as_os_str().is_empty() {
            return Ok(client);
        }
        let contents =
            std::fs::read_to_string(token_file).map_err(|source| ClientError::Credential {
                path: token_file.to_path_buf(),
                source,
            })?;
        let token = contents.trim();
        if !token.is_empty() {
            client.set_token(token.to_string());
        }
        Ok(client)
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, path: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("v1").extend(path);
        }
        url
    }

    fn request(&self, method: Method, path: &[&str]) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(%method, url = %url, "Sending secret store request");
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.header(VAULT_TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &[&str],
    ) -> Result<T, ClientError> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        let text = Self::read_body(operation, response).await?;
        Self::decode(operation, &text)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        let text = self.post(operation, path, body).await?;
        Self::decode(operation, &text)
    }

    async fn post<B: Serialize>(
        &self,
        operation: &'static str,
        path: &[&str],
        body: &B,
    ) -> Result<String, ClientError> {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        Self::read_body(operation, response).await
    }

    async fn read_body(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<String, ClientError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        if !status.is_success() {
            return Err(ClientError::Api {
                operation,
                status,
                body: text.trim_end().to_string(),
            });
        }
        Ok(text)
    }

    fn decode<T: DeserializeOwned>(operation: &'static str, text: &str) -> Result<T, ClientError> {
        serde_json::from_str(text).map_err(|source| ClientError::Decode { operation, source })
    }
}

impl SecretStore for VaultClient {
    async fn seal_status(&self) -> Result<SealStatus, ClientError> {
        self.get_json("seal status", &["sys", "seal-status"]).await
    }

    async fn init(&self, shares: u8, threshold: u8) -> Result<InitResponse, ClientError> {
        #[derive(Serialize)]
        struct InitRequest {
            secret_shares: u8,
            secret_threshold: u8,
        }
        self.post_json(
            "init",
            &["sys", "init"],
            &InitRequest {
                secret_shares: shares,
                secret_threshold: threshold,
            },
        )
        .await
    }

    async fn unseal(&self, key: &str) -> Result<SealStatus, ClientError> {
        #[derive(Serialize)]
        struct UnsealRequest<'a> {
            key: &'a str,
        }
        self.post_json("unseal", &["sys", "unseal"], &UnsealRequest { key })
            .await
    }

    async fn write_policy(&self, name: &str, rules: &str) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct PolicyRequest<'a> {
            policy: &'a str,
        }
        self.post(
            "write policy",
            &["sys", "policies", "acl", name],
            &PolicyRequest { policy: rules },
        )
        .await?;
        Ok(())
    }

    async fn list_auth_backends(&self) -> Result<BTreeSet<String>, ClientError> {
        let response: MountListResponse = self.get_json("list auth methods", &["sys", "auth"]).await?;
        Ok(response.into_names())
    }

    async fn enable_auth_backend(&self, backend: &AuthBackend) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct AuthRequest<'a> {
            #[serde(rename = "type")]
            auth_type: &'a str,
        }
        self.post(
            "enable auth method",
            &["sys", "auth", backend.path],
            &AuthRequest {
                auth_type: backend.kind,
            },
        )
        .await?;
        Ok(())
    }

    async fn write_secret(
        &self,
        path: &[&str],
        data: &serde_json::Value,
    ) -> Result<(), ClientError> {
        self.post("write secret", path, data).await?;
        Ok(())
    }

    async fn list_secret_mounts(&self) -> Result<BTreeSet<String>, ClientError> {
        let response: MountListResponse =
            self.get_json("list secrets engines", &["sys", "mounts"]).await?;
        Ok(response.into_names())
    }

    async fn enable_secrets_engine(&self, mount: &SecretsMount) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct MountRequest<'a> {
            #[serde(rename = "type")]
            mount_type: &'a str,
            options: BTreeMap<&'a str, &'a str>,
        }
        self.post(
            "enable secrets engine",
            &["sys", "mounts", mount.path],
            &MountRequest {
                mount_type: mount.kind,
                options: mount.options.iter().copied().collect(),
            },
        )
        .await?;
        Ok(())
    }
}
