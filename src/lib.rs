//! # Ecobundle
//!
//! Installs and uninstalls bundles: named add-on packages whose database part
//! lives in a PostgreSQL schema of the same name. Usable both as a standalone
//! binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! ecobundle = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ecobundle::bundle::BundleRoot;
//! use ecobundle::confirm::AssumeYes;
//! use ecobundle::gateway::PgConnector;
//! use ecobundle::provision::{InstallOptions, Provisioner};
//! use ecobundle::store::FileLedger;
//! use ecobundle::types::{BundleName, RoleName};
//! use tokio_util::sync::CancellationToken;
//!
//! let provisioner = Provisioner::new(
//!     Arc::new(PgConnector::from_url("postgres://postgres@localhost/eco", None)?),
//!     Arc::new(FileLedger::new("config.json")),
//!     Arc::new(AssumeYes),
//!     BundleRoot::new("./bundles"),
//!     RoleName::new("admin")?,
//! );
//! let shop = BundleName::new("shop")?;
//! let outcome = provisioner
//!     .install(&shop, InstallOptions::default(), &CancellationToken::new())
//!     .await?;
//! println!("{}", outcome.status);
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module and the interactive prompt. Disable
//!   with `default-features = false`.

pub mod bundle;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod confirm;
pub mod error;
pub mod gateway;
pub mod provision;
pub mod store;
pub mod types;
