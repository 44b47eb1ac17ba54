use std::io;

use anyhow::{Context, Result};
use tracing::info;
use vaultctl::config::Settings;
use vaultctl::lifecycle::Lifecycle;
use vaultctl::vault::VaultClient;

use crate::cli::args::UnsealArgs;
use crate::cli::output::print_unseal_outcome;
use crate::cli::prompt::Prompt;

pub(crate) async fn run_unseal(args: &UnsealArgs, settings: &Settings) -> Result<()> {
    let client = VaultClient::with_token_file(&settings.addr, &settings.token_file)
        .context("Failed to create Vault client")?;

    let keys = if args.keys.is_empty() {
        info!("No unseal keys provided via flags");
        let mut input = io::stdin().lock();
        let mut output = io::stdout().lock();
        Prompt::new(&mut input, &mut output).prompt_unseal_keys()?
    } else {
        args.keys.clone()
    };

    let outcome = Lifecycle::new(client).unseal(&keys).await?;
    print_unseal_outcome(&mut io::stdout().lock(), outcome)
}
