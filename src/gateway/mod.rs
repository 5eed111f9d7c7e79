pub mod catalog;
mod postgres;

pub use catalog::{Statement, StatementKind};
pub use postgres::PgConnector;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::BundleName;

/// Connector opens privileged database sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>>;
}

/// Session is one exclusive database connection.
///
/// Session-level state such as `search_path` persists between calls. Callers
/// must finish with [`Session::close`].
#[async_trait]
pub trait Session: Send {
    /// Executes a catalog statement, returning the number of affected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Executes a whole SQL script as a single batch.
    async fn run_script(&mut self, script: &str) -> Result<()>;

    async fn schema_exists(&mut self, schema: &BundleName) -> Result<bool>;

    async fn close(self: Box<Self>) -> Result<()>;
}
