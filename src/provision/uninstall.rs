use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Provisioner;
use crate::gateway::{Session, catalog};
use crate::store::LedgerChange;
use crate::types::{Action, BundleName, ProvisioningOutcome, Step, StepError, StepStatus};

impl Provisioner {
    /// Removes a bundle after confirmation.
    ///
    /// Best effort: database failures are recorded and the bundle still leaves
    /// the ledger. A declined confirmation changes nothing.
    pub async fn uninstall(
        &self,
        name: &BundleName,
        cancel: &CancellationToken,
    ) -> ProvisioningOutcome {
        let mut outcome = ProvisioningOutcome::new(name.clone(), Action::Uninstall);

        let prompt = format!(
            "This will delete bundle '{name}', causing loss of all data in the schema created by the bundle. Are you sure you want to do this?"
        );
        if !self.gate.confirm(&prompt) {
            outcome.record(Step::Confirm, StepStatus::skipped("declined by operator"));
            outcome.mark_declined();
            return outcome.finish();
        }
        outcome.record(Step::Confirm, StepStatus::Succeeded);

        match self.connect(cancel).await {
            Ok(mut session) => {
                outcome.record(Step::Connect, StepStatus::Succeeded);
                let abandoned = self
                    .remove_database_objects(&mut *session, name, cancel, &mut outcome)
                    .await;
                self.release(session, abandoned).await;
            }
            Err(e) => outcome.record(Step::Connect, StepStatus::failed(e)),
        }

        if outcome.cancelled {
            return outcome.finish();
        }

        let updated = self
            .ledger
            .apply(&LedgerChange::Remove(name.clone()))
            .map(|_| ())
            .map_err(|e| StepError::Ledger(e.to_string()));
        outcome.record(Step::UpdateLedger, updated);

        let outcome = outcome.finish();
        info!(bundle = %name, status = %outcome.status, "Uninstallation of bundle completed");
        outcome
    }

    /// Returns true if the session was abandoned mid-statement.
    async fn remove_database_objects(
        &self,
        session: &mut dyn Session,
        name: &BundleName,
        cancel: &CancellationToken,
        outcome: &mut ProvisioningOutcome,
    ) -> bool {
        match self
            .exec(session, &catalog::delete_bundle_categories(name), cancel)
            .await
        {
            Ok(rows) => {
                debug!(bundle = %name, rows, "Deleted web categories");
                outcome.record(Step::DeleteCategories, StepStatus::Succeeded);
            }
            Err(e) if e.poisons_session() => {
                let timed_out = !matches!(e, StepError::Cancelled);
                outcome.record(Step::DeleteCategories, StepStatus::failed(e));
                if timed_out {
                    outcome.record(
                        Step::DropSchema,
                        StepStatus::skipped("session unusable after timeout"),
                    );
                }
                return true;
            }
            Err(e) => outcome.record(Step::DeleteCategories, StepStatus::failed(e)),
        }

        // IF EXISTS: uninstalling a bundle whose schema is gone is not an error.
        let dropped = self.exec(session, &catalog::drop_schema(name), cancel).await;
        let abandoned = dropped.as_ref().is_err_and(StepError::poisons_session);
        outcome.record(Step::DropSchema, dropped.map(|_| ()));
        abandoned
    }
}
