use anyhow::{Context, Result};
use tracing::warn;
use vaultctl::config::Settings;
use vaultctl::lifecycle::{Lifecycle, ServiceAccount};
use vaultctl::vault::VaultClient;

use crate::cli::output::print_configure_report;

pub(crate) async fn run_setup(settings: &Settings) -> Result<()> {
    let client = VaultClient::with_token_file(&settings.addr, &settings.token_file)
        .context("Failed to create Vault client")?;
    if !client.has_token() {
        warn!("No Vault token configured; setup requests will be unauthenticated");
    }
    let account = ServiceAccount {
        username: settings.user.clone(),
        password: settings.pass.clone(),
    };
    let report = Lifecycle::new(client).configure(&account).await?;
    print_configure_report(&mut std::io::stdout().lock(), &report)
}
