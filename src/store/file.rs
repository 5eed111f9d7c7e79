use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use tempfile::NamedTempFile;

use super::{Ledger, LedgerChange, LedgerStore};
use crate::config::ConfigDocument;
use crate::error::{Error, Result};

/// How long a ledger update waits for another process to release the lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Ledger stored in the `bundlesInstalled` field of the JSON configuration document.
///
/// Saves rewrite the whole document through a temp file and rename, keeping
/// every field this tool does not own.
pub struct FileLedger {
    path: PathBuf,
    lock_timeout: Duration,
}

impl FileLedger {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Exclusive advisory lock on a sidecar file, released when the handle drops.
    ///
    /// The document itself is replaced by rename, so locking it directly would
    /// lock an inode that stops being the document after the first save.
    /// Gives up with `LedgerLocked` once the lock timeout has passed.
    fn lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        let deadline = Instant::now() + self.lock_timeout;
        while !file.try_lock_exclusive()? {
            if Instant::now() >= deadline {
                return Err(Error::LedgerLocked(lock_path));
            }
            thread::sleep(LOCK_RETRY_INTERVAL);
        }
        tracing::debug!("Acquired ledger lock {}", lock_path.display());
        Ok(file)
    }

    fn write_document(&self, doc: &ConfigDocument) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&doc.to_pretty_json()?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn save_locked(&self, ledger: &Ledger) -> Result<()> {
        let mut doc = ConfigDocument::read(&self.path)?;
        doc.bundles_installed = ledger.clone().into_entries();
        self.write_document(&doc)?;
        tracing::info!("{} updated", self.path.display());
        Ok(())
    }
}

impl LedgerStore for FileLedger {
    fn load(&self) -> Result<Ledger> {
        let doc = ConfigDocument::read(&self.path)?;
        Ok(Ledger::from_entries(doc.bundles_installed))
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        let _lock = self.lock()?;
        self.save_locked(ledger)
    }

    fn apply(&self, change: &LedgerChange) -> Result<Ledger> {
        let _lock = self.lock()?;
        let mut ledger = self.load()?;
        change.apply_to(&mut ledger);
        self.save_locked(&ledger)?;
        Ok(ledger)
    }
}
