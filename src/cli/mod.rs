mod bundle;
mod commands;
mod ledger;

pub use bundle::{run_install, run_uninstall};
pub use commands::{Commands, GlobalArgs};
pub use ledger::{run_list, run_verify};

use std::sync::Arc;

use crate::config::{Overrides, Settings};
use crate::confirm::{AssumeYes, ConfirmationGate, InquireGate};
use crate::gateway::PgConnector;
use crate::provision::Provisioner;
use crate::store::FileLedger;

impl From<&GlobalArgs> for Overrides {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            config_path: args.config.clone(),
            bundles_dir: args.bundles_dir.clone(),
            database_url: args.database_url.clone(),
            admin_role: args.admin_role.clone(),
            db_timeout_secs: args.db_timeout,
        }
    }
}

pub fn load_settings(args: &GlobalArgs) -> anyhow::Result<Settings> {
    Ok(Settings::load(args.into())?)
}

/// Picks how destructive operations are confirmed.
pub fn confirmation_gate(
    yes: bool,
    non_interactive: bool,
) -> anyhow::Result<Arc<dyn ConfirmationGate>> {
    if yes {
        Ok(Arc::new(AssumeYes))
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(Arc::new(InquireGate))
    }
}

/// Wires the PostgreSQL connector and file ledger described by `settings`.
pub fn init_provisioner(
    settings: &Settings,
    gate: Arc<dyn ConfirmationGate>,
) -> anyhow::Result<Provisioner> {
    let connector = PgConnector::from_url(&settings.database_url, Some(settings.db_timeout))?;
    let ledger = FileLedger::new(&settings.config_path);
    Ok(Provisioner::from_settings(
        settings,
        Arc::new(connector),
        Arc::new(ledger),
        gate,
    ))
}
