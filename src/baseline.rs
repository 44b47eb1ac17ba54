//! Fixed configuration applied by the setup phase.

/// A named ACL policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDefinition {
    pub name: &'static str,
    pub rules: &'static str,
}

/// An auth method mounted at `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthBackend {
    pub path: &'static str,
    pub kind: &'static str,
}

/// A secrets engine mounted at `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretsMount {
    pub path: &'static str,
    pub kind: &'static str,
    pub options: &'static [(&'static str, &'static str)],
}

pub const READ_WRITE_POLICY: PolicyDefinition = PolicyDefinition {
    name: "read-write",
    rules: r#"
path "secret/data/*" {
  capabilities = ["create", "read", "update", "delete", "list"]
}
path "secret/metadata/*" {
  capabilities = ["list"]
}"#,
};

pub const ADMIN_POLICY: PolicyDefinition = PolicyDefinition {
    name: "admin",
    rules: r#"
path "*" {
  capabilities = ["create", "read", "update", "delete", "list", "sudo"]
}"#,
};

pub const POLICIES: [PolicyDefinition; 2] = [READ_WRITE_POLICY, ADMIN_POLICY];

pub const USERPASS_AUTH: AuthBackend = AuthBackend {
    path: "userpass",
    kind: "userpass",
};

pub const KUBERNETES_AUTH: AuthBackend = AuthBackend {
    path: "kubernetes",
    kind: "kubernetes",
};

pub const AUTH_BACKENDS: [AuthBackend; 2] = [USERPASS_AUTH, KUBERNETES_AUTH];

pub const KV_MOUNT: SecretsMount = SecretsMount {
    path: "secret",
    kind: "kv",
    options: &[("version", "2")],
};

/// Path segments of a userpass user entry.
#[must_use]
pub fn userpass_user_path(username: &str) -> [&str; 4] {
    ["auth", USERPASS_AUTH.path, "users", username]
}
