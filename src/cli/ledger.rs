use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::bundle::BundleRoot;
use crate::confirm::AssumeYes;
use crate::provision::{BundleCondition, VerifyReport};
use crate::store::{FileLedger, LedgerStore};
use crate::types::BundleName;

use super::{GlobalArgs, init_provisioner, load_settings};

#[derive(Serialize)]
struct InstalledBundle {
    bundle: String,
    directory_present: bool,
}

pub fn run_list(global: &GlobalArgs, json: bool) -> anyhow::Result<()> {
    let settings = load_settings(global)?;
    let ledger = FileLedger::new(&settings.config_path).load()?;
    let root = BundleRoot::new(&settings.bundles_dir);

    let bundles: Vec<InstalledBundle> = ledger
        .iter()
        .map(|entry| InstalledBundle {
            bundle: entry.to_string(),
            directory_present: BundleName::new(entry)
                .is_ok_and(|name| root.resolve(&name).is_ok()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    if bundles.is_empty() {
        println!("No bundles installed");
        return Ok(());
    }
    for b in &bundles {
        if b.directory_present {
            println!("{}", b.bundle);
        } else {
            println!("{} (bundle directory missing)", b.bundle);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    #[serde(flatten)]
    report: &'a VerifyReport,
    repaired: Option<Vec<String>>,
}

pub async fn run_verify(
    global: &GlobalArgs,
    repair: bool,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let settings = load_settings(global)?;
    // Verify never prompts.
    let provisioner = init_provisioner(&settings, Arc::new(AssumeYes))?;

    let report = provisioner.verify(cancel).await?;
    let repaired = if repair && report.has_drift() {
        Some(provisioner.repair(&report)?.into_entries())
    } else {
        None
    };

    if json {
        let output = VerifyOutput {
            report: &report,
            repaired,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    for state in &report.bundles {
        let label = match state.condition {
            BundleCondition::Installed => "installed",
            BundleCondition::NotInstalled => "not installed",
            BundleCondition::MissingSchema => "DRIFT: in ledger, schema missing",
            BundleCondition::UntrackedSchema => "DRIFT: schema exists, not in ledger",
            BundleCondition::NoDatabaseComponent => "installed (no database component)",
            BundleCondition::InvalidName => "invalid bundle name, ignored",
        };
        println!("  {:<24} {label}", state.bundle);
    }
    println!();

    match repaired {
        Some(entries) => println!("Ledger repaired: {}", entries.join(", ")),
        None if report.has_drift() => println!("Drift found. Run with --repair to fix the ledger."),
        None => println!("Ledger matches the database."),
    }
    Ok(())
}
