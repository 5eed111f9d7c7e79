use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::confirm::{AssumeYes, ConfirmationGate};
use crate::provision::InstallOptions;
use crate::types::{Action, BundleName, OutcomeStatus, ProvisioningOutcome, StepStatus};

use super::{GlobalArgs, confirmation_gate, init_provisioner, load_settings};

#[allow(clippy::too_many_arguments)]
pub async fn run_install(
    global: &GlobalArgs,
    bundle: String,
    demo_data: bool,
    reinstall: bool,
    yes: bool,
    non_interactive: bool,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let name = BundleName::new(bundle)?;
    let settings = load_settings(global)?;

    // Only the uninstall half of a reinstall asks for confirmation.
    let gate: Arc<dyn ConfirmationGate> = if reinstall {
        confirmation_gate(yes, non_interactive)?
    } else {
        Arc::new(AssumeYes)
    };
    let provisioner = init_provisioner(&settings, gate)?;

    let options = InstallOptions {
        demo_data,
        reinstall,
    };
    let outcome = provisioner.install(&name, options, cancel).await?;
    report(&outcome, json)
}

pub async fn run_uninstall(
    global: &GlobalArgs,
    bundle: String,
    yes: bool,
    non_interactive: bool,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let name = BundleName::new(bundle)?;
    let settings = load_settings(global)?;
    let gate = confirmation_gate(yes, non_interactive)?;
    let provisioner = init_provisioner(&settings, gate)?;

    let outcome = provisioner.uninstall(&name, cancel).await;
    report(&outcome, json)
}

/// Prints the outcome. Step failures are reported, not returned; only an
/// interrupted run makes the command fail.
fn report(outcome: &ProvisioningOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        if let Some(previous) = &outcome.previous {
            print_outcome(previous);
        }
        print_outcome(outcome);
    }

    if outcome.status == OutcomeStatus::Cancelled {
        anyhow::bail!("Interrupted, the installation ledger was not updated");
    }
    Ok(())
}

fn print_outcome(outcome: &ProvisioningOutcome) {
    let verb = match outcome.action {
        Action::Install => "Install",
        Action::Uninstall => "Uninstall",
    };
    let title = format!("{verb} of bundle '{}': {}", outcome.bundle, outcome.status);

    println!();
    println!("{title}");
    println!("{}", "─".repeat(title.chars().count()));
    for record in &outcome.steps {
        match &record.status {
            StepStatus::Succeeded => println!("  {:<22} ok", record.step),
            StepStatus::Skipped { reason } => {
                println!("  {:<22} skipped ({reason})", record.step);
            }
            StepStatus::Failed { error } => println!("  {:<22} FAILED: {error}", record.step),
        }
    }
    if outcome.rolled_back() {
        println!();
        println!("Schema '{}' was rolled back.", outcome.bundle);
    }
    println!();
}
