mod file;
mod memory;

pub use file::FileLedger;
pub use memory::MemoryLedger;

use serde::Serialize;

use crate::error::Result;
use crate::types::BundleName;

/// Bundles believed to be installed, in installation order, without duplicates.
///
/// Entries are kept as plain strings so a hand-edited configuration with an
/// unexpected name still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<String>,
}

impl Ledger {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ledger = Self::default();
        for entry in entries {
            ledger.insert_str(entry.into());
        }
        ledger
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    /// Returns false if the bundle was already present.
    pub fn insert(&mut self, name: &BundleName) -> bool {
        self.insert_str(name.to_string())
    }

    fn insert_str(&mut self, name: String) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.entries.push(name);
        true
    }

    /// Returns false if the bundle was not present.
    pub fn remove(&mut self, name: &BundleName) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != name.as_str());
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

#[derive(Debug, Clone)]
pub enum LedgerChange {
    Add(BundleName),
    Remove(BundleName),
    Replace(Ledger),
}

impl LedgerChange {
    pub fn apply_to(&self, ledger: &mut Ledger) {
        match self {
            LedgerChange::Add(name) => {
                ledger.insert(name);
            }
            LedgerChange::Remove(name) => {
                ledger.remove(name);
            }
            LedgerChange::Replace(new) => *ledger = new.clone(),
        }
    }
}

/// LedgerStore persists the installation ledger.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Ledger>;

    /// Rewrites the whole ledger.
    fn save(&self, ledger: &Ledger) -> Result<()>;

    /// Loads, changes and saves the ledger as one step, returning the saved ledger.
    fn apply(&self, change: &LedgerChange) -> Result<Ledger> {
        let mut ledger = self.load()?;
        change.apply_to(&mut ledger);
        self.save(&ledger)?;
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> BundleName {
        BundleName::new(s).unwrap()
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut ledger = Ledger::default();
        assert!(ledger.insert(&name("shop")));
        assert!(!ledger.insert(&name("shop")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut ledger = Ledger::default();
        ledger.insert(&name("shop"));
        ledger.insert(&name("blog"));
        ledger.insert(&name("crm"));
        assert_eq!(ledger.iter().collect::<Vec<_>>(), vec!["shop", "blog", "crm"]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut ledger = Ledger::from_entries(["shop"]);
        assert!(!ledger.remove(&name("blog")));
        assert_eq!(ledger, Ledger::from_entries(["shop"]));
        assert!(ledger.remove(&name("shop")));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_from_entries_drops_duplicates() {
        let ledger = Ledger::from_entries(["shop", "blog", "shop"]);
        assert_eq!(ledger.into_entries(), vec!["shop", "blog"]);
    }

    #[test]
    fn test_change_replace() {
        let mut ledger = Ledger::from_entries(["shop"]);
        LedgerChange::Replace(Ledger::from_entries(["blog"])).apply_to(&mut ledger);
        assert_eq!(ledger, Ledger::from_entries(["blog"]));
    }
}
