use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::BundleName;

pub const INSTALL_SCRIPT: &str = "install.sql";
pub const DEMO_DATA_SCRIPT: &str = "demodata.sql";

/// Directory holding one subdirectory per bundle.
#[derive(Debug, Clone)]
pub struct BundleRoot {
    root: PathBuf,
}

impl BundleRoot {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: &BundleName) -> Result<BundleDir> {
        let path = self.root.join(name.as_str());
        if !path.is_dir() {
            return Err(Error::BundleNotFound {
                name: name.to_string(),
                path,
            });
        }
        Ok(BundleDir {
            name: name.clone(),
            path,
        })
    }

    /// Bundle directories whose names are valid bundle names, sorted.
    /// A missing root yields an empty list.
    pub fn list(&self) -> Result<Vec<BundleName>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(raw) = file_name.to_str() else {
                continue;
            };
            match BundleName::new(raw) {
                Ok(name) => names.push(name),
                Err(e) => tracing::debug!("Ignoring bundle directory {raw}: {e}"),
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Clone)]
pub struct BundleDir {
    name: BundleName,
    path: PathBuf,
}

impl BundleDir {
    pub fn name(&self) -> &BundleName {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_install_script(&self) -> bool {
        self.path.join(INSTALL_SCRIPT).is_file()
    }

    pub fn install_script(&self) -> io::Result<String> {
        fs::read_to_string(self.path.join(INSTALL_SCRIPT))
    }

    pub fn demo_data_script(&self) -> io::Result<String> {
        fs::read_to_string(self.path.join(DEMO_DATA_SCRIPT))
    }
}
