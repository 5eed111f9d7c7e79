use std::sync::Mutex;

use super::{Ledger, LedgerChange, LedgerStore};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    ledger: Mutex<Ledger>,
}

impl MemoryLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LedgerStore for MemoryLedger {
    fn load(&self) -> Result<Ledger> {
        Ok(self.ledger().clone())
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        *self.ledger() = ledger.clone();
        Ok(())
    }

    fn apply(&self, change: &LedgerChange) -> Result<Ledger> {
        let mut ledger = self.ledger();
        change.apply_to(&mut ledger);
        Ok(ledger.clone())
    }
}
