//! Init, unseal and configure phases of a secret store bootstrap.
//!
//! [`Lifecycle`] keeps no state of its own. Each phase reads what it needs
//! from the store before acting, so any phase can be re-run after a partial
//! failure.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::{debug, info};

use crate::baseline::{self, AUTH_BACKENDS, KV_MOUNT, POLICIES, READ_WRITE_POLICY};
use crate::error::{ClientError, ConfigureStep, LifecycleError};
use crate::vault::SecretStore;

pub const INIT_SECRET_SHARES: u8 = 5;
pub const INIT_SECRET_THRESHOLD: u8 = 3;

const _: () = assert!(INIT_SECRET_THRESHOLD <= INIT_SECRET_SHARES);

/// Bootstrap state as derived from the store's seal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Sealed { progress: u32, threshold: u32 },
    Unsealed,
}

/// Output of the init phase. Only the caller ever holds it.
#[derive(Debug, Clone)]
pub struct InitResult {
    pub root_token: String,
    pub key_shares: Vec<String>,
    pub threshold: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsealOutcome {
    AlreadyUnsealed,
    Unsealed { submitted: usize },
}

/// Userpass account created by the configure phase.
#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub username: String,
    pub password: String,
}

/// What the configure phase created, as opposed to found in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureReport {
    pub enabled_auth_backends: Vec<&'static str>,
    pub enabled_secrets_engine: bool,
}

pub struct Lifecycle<S> {
    store: S,
}

impl<S: SecretStore> Lifecycle<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Derives the current lifecycle state from the store.
    ///
    /// # Errors
    /// Returns an error if the seal status cannot be read.
    pub async fn state(&self) -> Result<LifecycleState, LifecycleError> {
        let status = self
            .store
            .seal_status()
            .await
            .map_err(LifecycleError::SealStatus)?;
        Ok(if status.initialized == Some(false) {
            LifecycleState::Uninitialized
        } else if status.sealed {
            LifecycleState::Sealed {
                progress: status.progress,
                threshold: status.t,
            }
        } else {
            LifecycleState::Unsealed
        })
    }

    /// Initializes the store with the fixed share count and threshold.
    ///
    /// An already-initialized store is reported as a failure, never skipped.
    ///
    /// # Errors
    /// Returns [`LifecycleError::Init`] with the store's error.
    pub async fn initialize(&self) -> Result<InitResult, LifecycleError> {
        info!(
            shares = INIT_SECRET_SHARES,
            threshold = INIT_SECRET_THRESHOLD,
            "Initializing vault"
        );
        let response = self
            .store
            .init(INIT_SECRET_SHARES, INIT_SECRET_THRESHOLD)
            .await
            .map_err(LifecycleError::Init)?;
        let key_shares = if response.keys.is_empty() {
            response.keys_base64
        } else {
            response.keys
        };
        info!("Vault initialized");
        Ok(InitResult {
            root_token: response.root_token,
            key_shares,
            threshold: INIT_SECRET_THRESHOLD,
        })
    }

    /// Submits `shares` in order until the store reports it is unsealed.
    ///
    /// Empty shares are skipped. Shares left over once the store unseals are
    /// never sent.
    ///
    /// # Errors
    /// Returns [`LifecycleError::Unseal`] as soon as a submission is rejected,
    /// and [`LifecycleError::SharesExhausted`] if the store is still sealed
    /// after the last share.
    pub async fn unseal<I>(&self, shares: I) -> Result<UnsealOutcome, LifecycleError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut status = self
            .store
            .seal_status()
            .await
            .map_err(LifecycleError::SealStatus)?;
        if !status.sealed {
            info!("Vault is already unsealed");
            return Ok(UnsealOutcome::AlreadyUnsealed);
        }

        let mut submitted = 0;
        for share in shares {
            let share = share.as_ref();
            if share.is_empty() {
                continue;
            }
            status = self
                .store
                .unseal(share)
                .await
                .map_err(LifecycleError::Unseal)?;
            submitted += 1;
            debug!(
                progress = status.progress,
                threshold = status.t,
                "Submitted unseal key"
            );
            if !status.sealed {
                info!(submitted, "Vault unsealed successfully");
                return Ok(UnsealOutcome::Unsealed { submitted });
            }
        }

        Err(LifecycleError::SharesExhausted {
            submitted,
            progress: status.progress,
            threshold: status.t,
        })
    }

    /// Applies the baseline policies, auth methods, service account and KV
    /// mount, stopping at the first failing step.
    ///
    /// # Errors
    /// Returns [`LifecycleError::Configure`] naming the step that failed.
    pub async fn configure(
        &self,
        account: &ServiceAccount,
    ) -> Result<ConfigureReport, LifecycleError> {
        info!("Applying vault configuration");
        let mut report = ConfigureReport::default();

        self.write_policies()
            .await
            .map_err(step_error(ConfigureStep::Policies))?;
        report.enabled_auth_backends = self
            .enable_auth_backends()
            .await
            .map_err(step_error(ConfigureStep::AuthBackends))?;
        self.create_user(account)
            .await
            .map_err(step_error(ConfigureStep::ServiceAccount))?;
        report.enabled_secrets_engine = self
            .enable_secrets_engine()
            .await
            .map_err(step_error(ConfigureStep::SecretsEngine))?;

        Ok(report)
    }

    async fn write_policies(&self) -> Result<(), ClientError> {
        info!("Creating policies");
        for policy in &POLICIES {
            self.store.write_policy(policy.name, policy.rules).await?;
        }
        Ok(())
    }

    async fn enable_auth_backends(&self) -> Result<Vec<&'static str>, ClientError> {
        let mut enabled = Vec::new();
        for backend in &AUTH_BACKENDS {
            let existing: BTreeSet<String> = self.store.list_auth_backends().await?;
            if existing.contains(backend.path) {
                debug!(path = backend.path, "Auth method already enabled");
                continue;
            }
            info!(path = backend.path, "Enabling {} auth", backend.kind);
            self.store.enable_auth_backend(backend).await?;
            enabled.push(backend.path);
        }
        Ok(enabled)
    }

    async fn create_user(&self, account: &ServiceAccount) -> Result<(), ClientError> {
        info!(user = %account.username, "Creating userpass user");
        let data = json!({
            "password": account.password,
            "policies": READ_WRITE_POLICY.name,
        });
        self.store
            .write_secret(&baseline::userpass_user_path(&account.username), &data)
            .await
    }

    async fn enable_secrets_engine(&self) -> Result<bool, ClientError> {
        let mounts = self.store.list_secret_mounts().await?;
        if mounts.contains(KV_MOUNT.path) {
            debug!(path = KV_MOUNT.path, "Secrets engine already mounted");
            return Ok(false);
        }
        info!(path = KV_MOUNT.path, "Mounting KV v2");
        self.store.enable_secrets_engine(&KV_MOUNT).await?;
        Ok(true)
    }
}

fn step_error(step: ConfigureStep) -> impl FnOnce(ClientError) -> LifecycleError {
    move |source| LifecycleError::Configure { step, source }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use reqwest::StatusCode;

    use super::*;
    use crate::baseline::{AuthBackend, SecretsMount};
    use crate::error::ErrorKind;
    use crate::vault::{InitResponse, SealStatus};

    /// In-memory store that remembers what was created and counts writes.
    #[derive(Default)]
    struct FakeStore {
        state: Mutex<FakeState>,
    }

    #[derive(Default)]
    struct FakeState {
        initialized: bool,
        sealed: bool,
        progress: u32,
        valid_keys: Vec<String>,
        auth_backends: BTreeSet<String>,
        mounts: BTreeSet<String>,
        policy_writes: BTreeMap<String, usize>,
        secret_writes: BTreeMap<String, usize>,
        auth_enables: usize,
        mount_enables: usize,
        unseal_calls: usize,
        fail_auth_list: bool,
    }

    impl FakeStore {
        fn sealed_with_keys(keys: &[&str]) -> Self {
            let store = Self::default();
            {
                let mut state = store.state.lock().expect("lock");
                state.initialized = true;
                state.sealed = true;
                state.valid_keys = keys.iter().map(ToString::to_string).collect();
            }
            store
        }

        fn unsealed() -> Self {
            let store = Self::default();
            {
                let mut state = store.state.lock().expect("lock");
                state.initialized = true;
                state.auth_backends.insert("token".to_string());
                state.mounts.insert("sys".to_string());
            }
            store
        }

        fn rejected(operation: &'static str) -> ClientError {
            ClientError::Api {
                operation,
                status: StatusCode::BAD_REQUEST,
                body: "rejected".to_string(),
            }
        }

        fn status(state: &FakeState) -> SealStatus {
            SealStatus {
                sealed: state.sealed,
                initialized: Some(state.initialized),
                t: u32::from(INIT_SECRET_THRESHOLD),
                n: u32::from(INIT_SECRET_SHARES),
                progress: state.progress,
            }
        }
    }

    impl SecretStore for FakeStore {
        async fn seal_status(&self) -> Result<SealStatus, ClientError> {
            Ok(Self::status(&self.state.lock().expect("lock")))
        }

        async fn init(&self, shares: u8, _threshold: u8) -> Result<InitResponse, ClientError> {
            let mut state = self.state.lock().expect("lock");
            if state.initialized {
                return Err(Self::rejected("init"));
            }
            state.initialized = true;
            state.sealed = true;
            let keys: Vec<String> = (1..=shares).map(|idx| format!("share-{idx}")).collect();
            state.valid_keys.clone_from(&keys);
            Ok(InitResponse {
                keys,
                keys_base64: Vec::new(),
                root_token: "s.root".to_string(),
            })
        }

        async fn unseal(&self, key: &str) -> Result<SealStatus, ClientError> {
            let mut state = self.state.lock().expect("lock");
            state.unseal_calls += 1;
            if !state.valid_keys.iter().any(|valid| valid == key) {
                return Err(Self::rejected("unseal"));
            }
            state.progress += 1;
            if state.progress >= u32::from(INIT_SECRET_THRESHOLD) {
                state.sealed = false;
                state.progress = 0;
            }
            Ok(Self::status(&state))
        }

        async fn write_policy(&self, name: &str, _rules: &str) -> Result<(), ClientError> {
            let mut state = self.state.lock().expect("lock");
            *state.policy_writes.entry(name.to_string()).or_default() += 1;
            Ok(())
        }

        async fn list_auth_backends(&self) -> Result<BTreeSet<String>, ClientError> {
            let state = self.state.lock().expect("lock");
            if state.fail_auth_list {
                return Err(Self::rejected("list auth methods"));
            }
            Ok(state.auth_backends.clone())
        }

        async fn enable_auth_backend(&self, backend: &AuthBackend) -> Result<(), ClientError> {
            let mut state = self.state.lock().expect("lock");
            state.auth_enables += 1;
            state.auth_backends.insert(backend.path.to_string());
            Ok(())
        }

        async fn write_secret(
            &self,
            path: &[&str],
            _data: &serde_json::Value,
        ) -> Result<(), ClientError> {
            let mut state = self.state.lock().expect("lock");
            *state.secret_writes.entry(path.join("/")).or_default() += 1;
            Ok(())
        }

        async fn list_secret_mounts(&self) -> Result<BTreeSet<String>, ClientError> {
            Ok(self.state.lock().expect("lock").mounts.clone())
        }

        async fn enable_secrets_engine(&self, mount: &SecretsMount) -> Result<(), ClientError> {
            let mut state = self.state.lock().expect("lock");
            state.mount_enables += 1;
            state.mounts.insert(mount.path.to_string());
            Ok(())
        }
    }

    fn account() -> ServiceAccount {
        ServiceAccount {
            username: "airflow".to_string(),
            password: "secret1234".to_string(),
        }
    }

    #[tokio::test]
    async fn full_bootstrap_reaches_unsealed_state() {
        let lifecycle = Lifecycle::new(FakeStore::default());
        assert_eq!(
            lifecycle.state().await.expect("state"),
            LifecycleState::Uninitialized
        );

        let init = lifecycle.initialize().await.expect("init");
        assert_eq!(init.key_shares.len(), usize::from(INIT_SECRET_SHARES));
        assert_eq!(init.threshold, INIT_SECRET_THRESHOLD);
        assert_eq!(
            lifecycle.state().await.expect("state"),
            LifecycleState::Sealed {
                progress: 0,
                threshold: 3
            }
        );

        let outcome = lifecycle.unseal(&init.key_shares).await.expect("unseal");
        assert_eq!(outcome, UnsealOutcome::Unsealed { submitted: 3 });
        assert_eq!(
            lifecycle.state().await.expect("state"),
            LifecycleState::Unsealed
        );
    }

    #[tokio::test]
    async fn initialize_twice_fails_with_precondition() {
        let lifecycle = Lifecycle::new(FakeStore::default());
        lifecycle.initialize().await.expect("first init");
        let err = lifecycle.initialize().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Init(_)));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn unseal_skips_empty_shares() {
        let lifecycle = Lifecycle::new(FakeStore::sealed_with_keys(&["a", "b", "c"]));
        let outcome = lifecycle
            .unseal(["a", "", "b", "", "c"])
            .await
            .expect("unseal");
        assert_eq!(outcome, UnsealOutcome::Unsealed { submitted: 3 });
        assert_eq!(lifecycle.store().state.lock().expect("lock").unseal_calls, 3);
    }

    #[tokio::test]
    async fn unseal_already_unsealed_submits_nothing() {
        let lifecycle = Lifecycle::new(FakeStore::unsealed());
        let outcome = lifecycle.unseal(["a", "b"]).await.expect("unseal");
        assert_eq!(outcome, UnsealOutcome::AlreadyUnsealed);
        assert_eq!(lifecycle.store().state.lock().expect("lock").unseal_calls, 0);
    }

    #[tokio::test]
    async fn unseal_reports_exhaustion_after_every_share() {
        let lifecycle = Lifecycle::new(FakeStore::sealed_with_keys(&["a", "b", "c"]));
        let err = lifecycle.unseal(["a", "b"]).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::SharesExhausted {
                submitted: 2,
                progress: 2,
                threshold: 3
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Exhaustion);
    }

    #[tokio::test]
    async fn unseal_aborts_on_rejected_share() {
        let lifecycle = Lifecycle::new(FakeStore::sealed_with_keys(&["a", "c"]));
        let err = lifecycle.unseal(["a", "bad", "c"]).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Unseal(_)));
        assert_eq!(lifecycle.store().state.lock().expect("lock").unseal_calls, 2);
    }

    #[tokio::test]
    async fn configure_twice_enables_mounts_once_and_rewrites_the_rest() {
        let lifecycle = Lifecycle::new(FakeStore::unsealed());

        let first = lifecycle.configure(&account()).await.expect("first run");
        assert_eq!(first.enabled_auth_backends, vec!["userpass", "kubernetes"]);
        assert!(first.enabled_secrets_engine);

        let second = lifecycle.configure(&account()).await.expect("second run");
        assert_eq!(second, ConfigureReport::default());

        let state = lifecycle.store().state.lock().expect("lock");
        assert_eq!(state.auth_enables, 2);
        assert_eq!(state.mount_enables, 1);
        assert_eq!(state.policy_writes.get("read-write"), Some(&2));
        assert_eq!(state.policy_writes.get("admin"), Some(&2));
        assert_eq!(
            state.secret_writes.get("auth/userpass/users/airflow"),
            Some(&2)
        );
    }

    #[tokio::test]
    async fn configure_stops_at_failing_step() {
        let store = FakeStore::unsealed();
        store.state.lock().expect("lock").fail_auth_list = true;
        let lifecycle = Lifecycle::new(store);

        let err = lifecycle.configure(&account()).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Configure {
                step: ConfigureStep::AuthBackends,
                ..
            }
        ));

        let state = lifecycle.store().state.lock().expect("lock");
        assert_eq!(state.policy_writes.len(), 2);
        assert!(state.secret_writes.is_empty());
        assert_eq!(state.mount_enables, 0);
    }
}
