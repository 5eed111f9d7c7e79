mod document;

pub use document::ConfigDocument;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::RoleName;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_BUNDLES_DIR: &str = "./bundles";
pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost:5432/postgres";
pub const DEFAULT_ADMIN_ROLE: &str = "admin";
pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

/// Values supplied on the command line or through the environment.
/// Unset values fall back to the configuration document, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub bundles_dir: Option<PathBuf>,
    pub database_url: Option<String>,
    pub admin_role: Option<String>,
    pub db_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub bundles_dir: PathBuf,
    pub database_url: String,
    pub admin_role: RoleName,
    /// Upper bound for every individual database call.
    pub db_timeout: Duration,
}

impl Settings {
    /// Resolves settings from overrides and the configuration document they point at.
    pub fn load(overrides: Overrides) -> Result<Self> {
        let config_path = overrides
            .config_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let doc = ConfigDocument::read(&config_path)?;

        let admin_role = overrides
            .admin_role
            .or(doc.admin_role)
            .unwrap_or_else(|| DEFAULT_ADMIN_ROLE.to_string());

        let db_timeout_secs = overrides
            .db_timeout_secs
            .or(doc.db_timeout_secs)
            .unwrap_or(DEFAULT_DB_TIMEOUT_SECS);
        if db_timeout_secs == 0 {
            return Err(Error::Config(
                "database timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            bundles_dir: overrides
                .bundles_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUNDLES_DIR)),
            database_url: overrides
                .database_url
                .or(doc.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            admin_role: RoleName::new(admin_role)?,
            db_timeout: Duration::from_secs(db_timeout_secs),
            config_path,
        })
    }
}
