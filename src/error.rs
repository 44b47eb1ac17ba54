use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Broad class of a failure, used to tell the operator what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The secret store could not be reached or answered unintelligibly.
    Connectivity,
    /// The secret store rejected the request for its current state.
    Precondition,
    /// Local input was unusable; no remote call was made.
    Configuration,
    /// Every supplied key share was submitted and the store is still sealed.
    Exhaustion,
}

/// Errors raised by the secret store client.
///
/// Remote failures carry the name of the operation that issued them and the
/// response body as returned by the server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid secret store address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to read token file {}", path.display())]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build secret store HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("{operation}: request failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: API error ({status}): {body}")]
    Api {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{operation}: failed to parse response")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress { .. } | Self::Credential { .. } | Self::Build(_) => {
                ErrorKind::Configuration
            }
            Self::Transport { .. } | Self::Decode { .. } => ErrorKind::Connectivity,
            Self::Api { .. } => ErrorKind::Precondition,
        }
    }
}

/// Step of the configure phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureStep {
    Policies,
    AuthBackends,
    ServiceAccount,
    SecretsEngine,
}

impl fmt::Display for ConfigureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Self::Policies => "create policies",
            Self::AuthBackends => "enable auth methods",
            Self::ServiceAccount => "create user",
            Self::SecretsEngine => "enable secrets engine",
        };
        f.write_str(action)
    }
}

/// Errors raised by the lifecycle phases.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("vault init failed")]
    Init(#[source] ClientError),

    #[error("failed to check seal status")]
    SealStatus(#[source] ClientError),

    #[error("unseal error")]
    Unseal(#[source] ClientError),

    #[error(
        "vault still sealed after {submitted} provided key shares (progress {progress}/{threshold})"
    )]
    SharesExhausted {
        submitted: usize,
        progress: u32,
        threshold: u32,
    },

    #[error("failed to {step}")]
    Configure {
        step: ConfigureStep,
        #[source]
        source: ClientError,
    },
}

impl LifecycleError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Init(source)
            | Self::SealStatus(source)
            | Self::Unseal(source)
            | Self::Configure { source, .. } => source.kind(),
            Self::SharesExhausted { .. } => ErrorKind::Exhaustion,
        }
    }
}
