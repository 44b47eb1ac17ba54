use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;
use vaultctl::lifecycle::{ConfigureReport, InitResult, LifecycleState, UnsealOutcome};

pub(crate) fn print_init_result(out: &mut dyn Write, result: &InitResult) -> Result<()> {
    writeln!(out, "Vault initialized successfully!")?;
    writeln!(out, "Root Token:")?;
    writeln!(out, "  {}", result.root_token)?;
    writeln!(
        out,
        "Unseal Keys ({} required to unseal):",
        result.threshold
    )?;
    for (idx, key) in result.key_shares.iter().enumerate() {
        writeln!(out, "  Key {}: {key}", idx + 1)?;
    }
    out.flush().context("Failed to write init result")
}

pub(crate) fn print_unseal_outcome(out: &mut dyn Write, outcome: UnsealOutcome) -> Result<()> {
    match outcome {
        UnsealOutcome::AlreadyUnsealed => writeln!(out, "Vault is already unsealed")?,
        UnsealOutcome::Unsealed { .. } => writeln!(out, "Vault unsealed successfully!")?,
    }
    Ok(())
}

pub(crate) fn print_configure_report(out: &mut dyn Write, report: &ConfigureReport) -> Result<()> {
    info!(
        auth_methods = ?report.enabled_auth_backends,
        secrets_engine = report.enabled_secrets_engine,
        "Setup changes applied"
    );
    writeln!(out, "Vault setup completed successfully!")?;
    Ok(())
}

pub(crate) fn print_lifecycle_state(
    out: &mut dyn Write,
    addr: &str,
    state: LifecycleState,
) -> Result<()> {
    writeln!(out, "vault status: {addr}")?;
    match state {
        LifecycleState::Uninitialized => writeln!(out, "- initialized: false")?,
        LifecycleState::Sealed {
            progress,
            threshold,
        } => {
            writeln!(out, "- initialized: true")?;
            writeln!(out, "- sealed: true")?;
            writeln!(out, "- unseal progress: {progress}/{threshold}")?;
        }
        LifecycleState::Unsealed => {
            writeln!(out, "- initialized: true")?;
            writeln!(out, "- sealed: false")?;
        }
    }
    Ok(())
}
