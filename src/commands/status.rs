use anyhow::{Context, Result};
use vaultctl::config::Settings;
use vaultctl::lifecycle::Lifecycle;
use vaultctl::vault::VaultClient;

use crate::cli::output::print_lifecycle_state;

pub(crate) async fn run_status(settings: &Settings) -> Result<()> {
    let client = VaultClient::new(&settings.addr).context("Failed to create Vault client")?;
    let state = Lifecycle::new(client).state().await?;
    print_lifecycle_state(&mut std::io::stdout().lock(), &settings.addr, state)
}
