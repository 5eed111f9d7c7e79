#![allow(dead_code)]

mod fake_database;

pub use fake_database::{FAILING_SCRIPT_MARKER, FakeDatabase, HANGING_SCRIPT_MARKER, count};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ecobundle::bundle::BundleRoot;
use ecobundle::confirm::ConfirmationGate;
use ecobundle::provision::Provisioner;
use ecobundle::store::{Ledger, LedgerStore, MemoryLedger};
use ecobundle::types::{BundleName, RoleName};
use tempfile::TempDir;

/// Answers every prompt the same way and remembers what was asked.
pub struct ScriptedGate {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGate {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }
}

/// A bundles directory, a fake database and an in-memory ledger wired into a
/// provisioner.
pub struct Harness {
    pub temp_dir: TempDir,
    pub db: FakeDatabase,
    pub ledger: Arc<MemoryLedger>,
    pub gate: Arc<ScriptedGate>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gate(ScriptedGate::new(true))
    }

    pub fn declining() -> Self {
        Self::with_gate(ScriptedGate::new(false))
    }

    fn with_gate(gate: ScriptedGate) -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            db: FakeDatabase::new(),
            ledger: Arc::new(MemoryLedger::default()),
            gate: Arc::new(gate),
        }
    }

    pub fn bundles_dir(&self) -> PathBuf {
        self.temp_dir.path().join("bundles")
    }

    /// Creates an empty bundle directory.
    pub fn bundle(&self, name: &str) -> PathBuf {
        let dir = self.bundles_dir().join(name);
        fs::create_dir_all(&dir).expect("create bundle dir");
        dir
    }

    pub fn bundle_with_install(&self, name: &str, install_sql: &str) -> PathBuf {
        let dir = self.bundle(name);
        write(&dir, "install.sql", install_sql);
        dir
    }

    pub fn provisioner(&self) -> Provisioner {
        Provisioner::new(
            Arc::new(self.db.clone()),
            self.ledger.clone(),
            self.gate.clone(),
            BundleRoot::new(self.bundles_dir()),
            RoleName::new("admin").unwrap(),
        )
    }

    pub fn ledger_entries(&self) -> Vec<String> {
        self.ledger.load().unwrap().into_entries()
    }

    pub fn seed_ledger(&self, entries: &[&str]) {
        self.ledger
            .save(&Ledger::from_entries(entries.iter().copied()))
            .unwrap();
    }
}

pub fn write(dir: &Path, file: &str, contents: &str) {
    fs::write(dir.join(file), contents).expect("write bundle file");
}

pub fn name(s: &str) -> BundleName {
    BundleName::new(s).unwrap()
}
