use std::io;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Provisioner;
use crate::bundle::BundleDir;
use crate::error::Result;
use crate::gateway::{Session, catalog};
use crate::store::LedgerChange;
use crate::types::{
    Action, BundleName, ProvisioningOutcome, Step, StepError, StepStatus,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Run `demodata.sql` after a successful install.
    pub demo_data: bool,
    /// Uninstall first, then install.
    pub reinstall: bool,
}

impl Provisioner {
    /// Installs a bundle.
    ///
    /// Fails only when the bundle directory does not exist. Every other failure
    /// is recorded in the outcome, and the ledger gains the bundle even if the
    /// database part failed, unless the run was cancelled.
    pub async fn install(
        &self,
        name: &BundleName,
        options: InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<ProvisioningOutcome> {
        let bundle = self.bundles.resolve(name)?;
        let mut outcome = ProvisioningOutcome::new(name.clone(), Action::Install);
        info!(bundle = %name, path = %bundle.path().display(), "Installing bundle");

        if options.reinstall {
            info!(bundle = %name, "Uninstalling bundle before reinstallation");
            let previous = self.uninstall(name, cancel).await;
            outcome.previous = Some(Box::new(previous));
        }

        if cancel.is_cancelled() {
            outcome.mark_cancelled();
            return Ok(outcome.finish());
        }

        match bundle.install_script() {
            Ok(script) => {
                outcome.record(Step::ReadInstallScript, StepStatus::Succeeded);
                self.install_database(&bundle, &script, options.demo_data, cancel, &mut outcome)
                    .await;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => outcome.record(
                Step::ReadInstallScript,
                StepStatus::skipped("install.sql not present, bundle has no database component"),
            ),
            Err(e) => outcome.record(
                Step::ReadInstallScript,
                StepStatus::skipped(format!("install.sql could not be read: {e}")),
            ),
        }

        if outcome.cancelled {
            return Ok(outcome.finish());
        }

        let updated = self
            .ledger
            .apply(&LedgerChange::Add(name.clone()))
            .map(|_| ())
            .map_err(|e| StepError::Ledger(e.to_string()));
        outcome.record(Step::UpdateLedger, updated);

        let outcome = outcome.finish();
        info!(bundle = %name, status = %outcome.status, "Installation of bundle completed");
        Ok(outcome)
    }

    async fn install_database(
        &self,
        bundle: &BundleDir,
        script: &str,
        demo_data: bool,
        cancel: &CancellationToken,
        outcome: &mut ProvisioningOutcome,
    ) {
        let mut session = match self.connect(cancel).await {
            Ok(session) => {
                outcome.record(Step::Connect, StepStatus::Succeeded);
                session
            }
            Err(e) => {
                outcome.record(Step::Connect, StepStatus::failed(e));
                return;
            }
        };

        let abandoned = self
            .install_schema(&mut *session, bundle, script, demo_data, cancel, outcome)
            .await;
        self.release(session, abandoned).await;
    }

    /// Creates and fills the schema. Returns true if the session was abandoned
    /// mid-statement and must not be reused.
    async fn install_schema(
        &self,
        session: &mut dyn Session,
        bundle: &BundleDir,
        script: &str,
        demo_data: bool,
        cancel: &CancellationToken,
        outcome: &mut ProvisioningOutcome,
    ) -> bool {
        let name = bundle.name();

        // A failed create means nothing of ours exists yet, most often because
        // the bundle is already installed. Nothing to clean up.
        if let Err(e) = self.exec(session, &catalog::create_schema(name), cancel).await {
            let abandoned = e.poisons_session();
            outcome.record(Step::CreateSchema, StepStatus::failed(e));
            return abandoned;
        }
        outcome.record(Step::CreateSchema, StepStatus::Succeeded);

        let setup = [
            (
                Step::GrantPrivileges,
                catalog::grant_admin_privileges(name, &self.admin_role),
            ),
            (Step::SetSearchPath, catalog::set_search_path(name)),
        ];
        for (step, statement) in &setup {
            if let Err(e) = self.exec(session, statement, cancel).await {
                return self.roll_back(session, *step, e, name, outcome).await;
            }
            outcome.record(*step, StepStatus::Succeeded);
        }

        if let Err(e) = self.run_script(session, script, cancel).await {
            return self
                .roll_back(session, Step::RunInstallScript, e, name, outcome)
                .await;
        }
        outcome.record(Step::RunInstallScript, StepStatus::Succeeded);

        if !demo_data {
            outcome.record(Step::RunDemoData, StepStatus::skipped("demo data not requested"));
            return false;
        }
        self.install_demo_data(session, bundle, cancel, outcome).await
    }

    /// Records the failed step and drops the schema created by this attempt.
    async fn roll_back(
        &self,
        session: &mut dyn Session,
        failed: Step,
        error: StepError,
        name: &BundleName,
        outcome: &mut ProvisioningOutcome,
    ) -> bool {
        let abandoned = error.poisons_session();
        outcome.record(failed, StepStatus::failed(error));
        info!(bundle = %name, "Aborting database installation and cleaning up");

        let dropped = if abandoned {
            self.drop_schema_on_new_session(name).await
        } else {
            self.bounded(session.execute(&catalog::drop_schema(name)))
                .await
                .map(|_| ())
                .map_err(StepError::from)
        };
        outcome.record(Step::Rollback, dropped);
        abandoned
    }

    /// Demo data is optional: failures are recorded and the schema is kept,
    /// except on cancellation, which rolls the install back.
    async fn install_demo_data(
        &self,
        session: &mut dyn Session,
        bundle: &BundleDir,
        cancel: &CancellationToken,
        outcome: &mut ProvisioningOutcome,
    ) -> bool {
        let script = match bundle.demo_data_script() {
            Ok(script) => {
                outcome.record(Step::ReadDemoData, StepStatus::Succeeded);
                script
            }
            Err(e) => {
                let reason = if e.kind() == io::ErrorKind::NotFound {
                    "demodata.sql not present".to_string()
                } else {
                    format!("demodata.sql could not be read: {e}")
                };
                outcome.record(Step::ReadDemoData, StepStatus::skipped(reason));
                return false;
            }
        };

        match self.run_script(session, &script, cancel).await {
            // A cancelled install must not leave a schema the ledger does not list.
            Err(e @ StepError::Cancelled) => {
                self.roll_back(session, Step::RunDemoData, e, bundle.name(), outcome)
                    .await
            }
            result => {
                let abandoned = result.as_ref().is_err_and(StepError::poisons_session);
                outcome.record(Step::RunDemoData, result);
                abandoned
            }
        }
    }
}
