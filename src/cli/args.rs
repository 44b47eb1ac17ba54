use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use vaultctl::config::Overrides;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Initialize, unseal and set up a Vault server",
    long_about = None
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) connection: ConnectionArgs,

    #[command(flatten)]
    pub(crate) verbosity: VerbosityArgs,

    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Initialize Vault and output unseal keys and root token
    #[command(visible_alias = "i")]
    Init,
    /// Unseal Vault using unseal keys
    #[command(visible_alias = "u")]
    Unseal(UnsealArgs),
    /// Set up policies, auth methods, the userpass user and the KV secrets engine
    #[command(visible_alias = "s")]
    Setup,
    /// Show initialization and seal status
    Status,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ConnectionArgs {
    /// Config file (TOML, JSON or YAML)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Vault address
    #[arg(long, global = true)]
    pub(crate) vault_addr: Option<String>,

    /// Path to a file holding the Vault token
    #[arg(long, global = true, visible_alias = "vault-secret")]
    pub(crate) vault_token_file: Option<PathBuf>,

    /// Userpass username created by setup
    #[arg(long, global = true)]
    pub(crate) vault_user: Option<String>,

    /// Userpass password created by setup
    #[arg(long, global = true)]
    pub(crate) vault_pass: Option<String>,
}

impl ConnectionArgs {
    pub(crate) fn overrides(&self) -> Overrides {
        Overrides {
            addr: self.vault_addr.clone(),
            token_file: self.vault_token_file.clone(),
            user: self.vault_user.clone(),
            pass: self.vault_pass.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub(crate) struct VerbosityArgs {
    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub(crate) verbose: bool,

    /// Quiet mode
    #[arg(short, long, global = true)]
    pub(crate) quiet: bool,
}

impl VerbosityArgs {
    pub(crate) fn level(self) -> LevelFilter {
        if self.quiet {
            LevelFilter::OFF
        } else if self.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct UnsealArgs {
    /// Unseal key (repeatable); prompts on stdin when omitted
    #[arg(long = "key", value_delimiter = ',')]
    pub(crate) keys: Vec<String>,
}
