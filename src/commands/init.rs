use anyhow::{Context, Result};
use vaultctl::config::Settings;
use vaultctl::lifecycle::Lifecycle;
use vaultctl::vault::VaultClient;

use crate::cli::output::print_init_result;

pub(crate) async fn run_init(settings: &Settings) -> Result<()> {
    let client = VaultClient::new(&settings.addr).context("Failed to create Vault client")?;
    let result = Lifecycle::new(client).initialize().await?;
    print_init_result(&mut std::io::stdout().lock(), &result)
}
