use std::collections::BTreeSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Provisioner;
use crate::error::Result;
use crate::gateway::Session;
use crate::store::{Ledger, LedgerChange};
use crate::types::BundleName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleCondition {
    /// In the ledger and the schema exists.
    Installed,
    /// Neither in the ledger nor in the database.
    NotInstalled,
    /// In the ledger but the schema does not exist.
    MissingSchema,
    /// The schema exists but the ledger does not list the bundle.
    UntrackedSchema,
    /// In the ledger, no schema, and the bundle has no install.sql.
    NoDatabaseComponent,
    /// Ledger entry that is not a valid bundle name; left alone.
    InvalidName,
}

impl BundleCondition {
    pub fn is_drift(self) -> bool {
        matches!(
            self,
            BundleCondition::MissingSchema | BundleCondition::UntrackedSchema
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleState {
    pub bundle: String,
    pub in_ledger: bool,
    pub schema_exists: bool,
    pub condition: BundleCondition,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub bundles: Vec<BundleState>,
}

impl VerifyReport {
    pub fn drift(&self) -> impl Iterator<Item = &BundleState> {
        self.bundles.iter().filter(|b| b.condition.is_drift())
    }

    pub fn has_drift(&self) -> bool {
        self.drift().next().is_some()
    }

    pub fn condition_of(&self, bundle: &str) -> Option<BundleCondition> {
        self.bundles
            .iter()
            .find(|b| b.bundle == bundle)
            .map(|b| b.condition)
    }
}

impl Provisioner {
    /// Compares the ledger with the schemas that actually exist, for every
    /// ledger entry and every bundle directory.
    pub async fn verify(&self, cancel: &CancellationToken) -> Result<VerifyReport> {
        let ledger = self.ledger.load()?;
        let on_disk = self.bundles.list()?;

        let mut candidates: BTreeSet<String> = ledger.iter().map(str::to_string).collect();
        candidates.extend(on_disk.iter().map(ToString::to_string));

        let mut session = self.guarded(cancel, self.connector.connect()).await?;
        let result = self
            .inspect(&mut *session, &ledger, candidates, cancel)
            .await;
        let abandoned = result.is_err();
        if let Ok(report) = &result {
            info!(
                bundles = report.bundles.len(),
                drifted = report.drift().count(),
                "Verified installation ledger"
            );
        }
        self.release(session, abandoned).await;
        result
    }

    async fn inspect(
        &self,
        session: &mut dyn Session,
        ledger: &Ledger,
        candidates: BTreeSet<String>,
        cancel: &CancellationToken,
    ) -> Result<VerifyReport> {
        let mut bundles = Vec::with_capacity(candidates.len());

        for raw in candidates {
            let in_ledger = ledger.contains(&raw);
            let Ok(name) = BundleName::new(raw.as_str()) else {
                warn!("Ledger entry '{raw}' is not a valid bundle name");
                bundles.push(BundleState {
                    bundle: raw,
                    in_ledger,
                    schema_exists: false,
                    condition: BundleCondition::InvalidName,
                });
                continue;
            };

            let schema_exists = self.guarded(cancel, session.schema_exists(&name)).await?;
            let condition = match (in_ledger, schema_exists) {
                (true, true) => BundleCondition::Installed,
                (false, true) => BundleCondition::UntrackedSchema,
                (false, false) => BundleCondition::NotInstalled,
                (true, false) => {
                    let database_less = self
                        .bundles
                        .resolve(&name)
                        .is_ok_and(|dir| !dir.has_install_script());
                    if database_less {
                        BundleCondition::NoDatabaseComponent
                    } else {
                        BundleCondition::MissingSchema
                    }
                }
            };

            if condition.is_drift() {
                warn!(bundle = %name, ?condition, "Ledger drift detected");
            }
            bundles.push(BundleState {
                bundle: raw,
                in_ledger,
                schema_exists,
                condition,
            });
        }

        Ok(VerifyReport { bundles })
    }

    /// Rewrites the ledger so it lists exactly the bundles whose schema exists,
    /// keeping database-less bundles and entries it cannot judge.
    pub fn repair(&self, report: &VerifyReport) -> Result<Ledger> {
        let current = self.ledger.load()?;

        let mut repaired: Vec<String> = current
            .iter()
            .filter(|entry| {
                report.condition_of(entry) != Some(BundleCondition::MissingSchema)
            })
            .map(str::to_string)
            .collect();
        repaired.extend(
            report
                .bundles
                .iter()
                .filter(|b| b.condition == BundleCondition::UntrackedSchema)
                .map(|b| b.bundle.clone()),
        );

        let ledger = self
            .ledger
            .apply(&LedgerChange::Replace(Ledger::from_entries(repaired)))?;
        info!(bundles = ledger.len(), "Installation ledger repaired");
        Ok(ledger)
    }
}
