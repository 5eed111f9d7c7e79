//! Bundle install, uninstall and ledger verification.
//!
//! Every operation runs to completion and reports what happened per step in a
//! [`ProvisioningOutcome`]. Only a missing bundle directory aborts an install.

mod install;
mod uninstall;
mod verify;

pub use install::InstallOptions;
pub use verify::{BundleCondition, BundleState, VerifyReport};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bundle::BundleRoot;
use crate::config::{DEFAULT_DB_TIMEOUT_SECS, Settings};
use crate::confirm::ConfirmationGate;
use crate::error::{Error, Result};
use crate::gateway::{Connector, Session, Statement, catalog};
use crate::store::LedgerStore;
use crate::types::{BundleName, RoleName, StepError};

type StepResult<T> = std::result::Result<T, StepError>;

pub struct Provisioner {
    connector: Arc<dyn Connector>,
    ledger: Arc<dyn LedgerStore>,
    gate: Arc<dyn ConfirmationGate>,
    bundles: BundleRoot,
    admin_role: RoleName,
    timeout: Duration,
}

impl Provisioner {
    pub fn new(
        connector: Arc<dyn Connector>,
        ledger: Arc<dyn LedgerStore>,
        gate: Arc<dyn ConfirmationGate>,
        bundles: BundleRoot,
        admin_role: RoleName,
    ) -> Self {
        Self {
            connector,
            ledger,
            gate,
            bundles,
            admin_role,
            timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECS),
        }
    }

    /// Builds a provisioner from resolved settings with the given collaborators.
    pub fn from_settings(
        settings: &Settings,
        connector: Arc<dyn Connector>,
        ledger: Arc<dyn LedgerStore>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self::new(
            connector,
            ledger,
            gate,
            BundleRoot::new(settings.bundles_dir.clone()),
            settings.admin_role.clone(),
        )
        .with_timeout(settings.db_timeout)
    }

    /// Upper bound for each database call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn bundles(&self) -> &BundleRoot {
        &self.bundles
    }

    pub fn ledger(&self) -> &dyn LedgerStore {
        self.ledger.as_ref()
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or(Err(Error::Timeout(self.timeout)))
    }

    /// Bounded by the timeout and abandoned as soon as `cancel` fires.
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            res = self.bounded(fut) => res,
        }
    }

    async fn connect(&self, cancel: &CancellationToken) -> StepResult<Box<dyn Session>> {
        self.guarded(cancel, self.connector.connect())
            .await
            .map_err(StepError::from)
    }

    async fn exec(
        &self,
        session: &mut dyn Session,
        statement: &Statement,
        cancel: &CancellationToken,
    ) -> StepResult<u64> {
        debug!(kind = ?statement.kind, schema = %statement.schema, "Executing statement");
        self.guarded(cancel, session.execute(statement))
            .await
            .map_err(StepError::from)
    }

    async fn run_script(
        &self,
        session: &mut dyn Session,
        script: &str,
        cancel: &CancellationToken,
    ) -> StepResult<()> {
        self.guarded(cancel, session.run_script(script))
            .await
            .map_err(StepError::from)
    }

    /// Drops a schema on a fresh session. Used when the current session was
    /// abandoned mid-statement. Not cancellable.
    async fn drop_schema_on_new_session(&self, name: &BundleName) -> StepResult<()> {
        let mut session = match self.bounded(self.connector.connect()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(bundle = %name, "Could not open a fresh session to roll back schema: {e}");
                return Err(StepError::Other(format!(
                    "could not open a fresh session for rollback: {e}"
                )));
            }
        };
        let result = self
            .bounded(session.execute(&catalog::drop_schema(name)))
            .await
            .map(|_| ())
            .map_err(StepError::from);
        self.release(session, false).await;
        result
    }

    /// Closes the session. A session abandoned mid-statement is dropped instead,
    /// which closes the socket without waiting on the server.
    async fn release(&self, session: Box<dyn Session>, abandoned: bool) {
        if abandoned {
            debug!("Dropping interrupted database session");
            drop(session);
            return;
        }
        if let Err(e) = self.bounded(session.close()).await {
            warn!("Failed to close database session: {e}");
        }
    }
}
