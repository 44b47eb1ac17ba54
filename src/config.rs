use std::path::{Path, PathBuf};

use anyhow::Result;
use config::{Config, ConfigError, Environment, File, Map, Source, Value};
use serde::Deserialize;

/// Connection and service-account settings shared by every command.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub addr: String,
    pub token_file: PathBuf,
    pub user: String,
    pub pass: String,
}

/// Command-line values that take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub addr: Option<String>,
    pub token_file: Option<PathBuf>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

pub const DEFAULT_ADDR: &str = "http://127.0.0.1:8200";
pub const DEFAULT_CONFIG_FILE: &str = "vaultctl.toml";
const DEFAULT_TOKEN_FILE: &str = "";
const DEFAULT_USER: &str = "airflow";
const DEFAULT_PASS: &str = "secret1234";
const ENV_PREFIX: &str = "VAULT";

/// Older key names, mapped to the keys `Settings` reads. `secret` is what
/// `VAULT_SECRET` becomes once the prefix is stripped.
const LEGACY_KEYS: [(&str, &str); 5] = [
    ("vault_addr", "addr"),
    ("vault_secret", "token_file"),
    ("vault_user", "user"),
    ("vault_pass", "pass"),
    ("secret", "token_file"),
];

/// Renames legacy keys of the wrapped source. A key spelled both ways keeps
/// the current spelling.
#[derive(Debug, Clone)]
struct LegacyKeys<S>(S);

impl<S> Source for LegacyKeys<S>
where
    S: Source + Clone + Send + Sync + 'static,
{
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        let mut values = self.0.collect()?;
        for (legacy, key) in LEGACY_KEYS {
            if let Some(value) = values.remove(legacy) {
                values.entry(key.to_string()).or_insert(value);
            }
        }
        Ok(values)
    }
}

impl Settings {
    /// Loads settings from defaults, `VAULT_*` environment variables and a
    /// TOML, JSON or YAML config file, in increasing order of precedence.
    /// The `vault_`-prefixed key names and `VAULT_SECRET` are accepted as
    /// well.
    ///
    /// An explicit `config_path` must exist; otherwise `vaultctl.toml` is read
    /// only if present.
    ///
    /// # Errors
    /// Returns error if configuration parsing fails (e.g. file not found, invalid format).
    pub fn new(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(config_path, None)
    }

    fn from_sources(
        config_path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .set_default("addr", DEFAULT_ADDR)?
            .set_default("token_file", DEFAULT_TOKEN_FILE)?
            .set_default("user", DEFAULT_USER)?
            .set_default("pass", DEFAULT_PASS)?
            // e.g. VAULT_ADDR, VAULT_TOKEN_FILE or VAULT_SECRET
            .add_source(LegacyKeys(Environment::with_prefix(ENV_PREFIX).source(env)))
            .add_source(LegacyKeys(file))
            .build()?
            .try_deserialize()
    }

    /// Merges CLI arguments into the settings, overriding values if present.
    pub fn merge_with_args(&mut self, args: &Overrides) {
        if let Some(addr) = &args.addr {
            addr.clone_into(&mut self.addr);
        }
        if let Some(token_file) = &args.token_file {
            token_file.clone_into(&mut self.token_file);
        }
        if let Some(user) = &args.user {
            user.clone_into(&mut self.user);
        }
        if let Some(pass) = &args.pass {
            pass.clone_into(&mut self.pass);
        }
    }

    /// Validates configuration values for correctness.
    ///
    /// # Errors
    /// Returns error if any setting is empty or the address is not an http(s) URL.
    pub fn validate(&self) -> Result<()> {
        if !(self.addr.starts_with("http://") || self.addr.starts_with("https://")) {
            anyhow::bail!("addr must be an http:// or https:// URL, got {:?}", self.addr);
        }
        if self.user.trim().is_empty() {
            anyhow::bail!("user must not be empty");
        }
        if self.pass.is_empty() {
            anyhow::bail!("pass must not be empty");
        }
        Ok(())
    }
}
