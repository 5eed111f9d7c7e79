//! In-memory stand-in for PostgreSQL that understands the catalog statements
//! and a tiny subset of install scripts.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ecobundle::error::{Error, Result};
use ecobundle::gateway::{Connector, Session, Statement, StatementKind};
use ecobundle::types::BundleName;

/// Scripts containing this marker fail with a syntax error.
pub const FAILING_SCRIPT_MARKER: &str = "INVALID";
/// Scripts containing this marker never finish.
pub const HANGING_SCRIPT_MARKER: &str = "pg_sleep";

#[derive(Default)]
struct State {
    /// Schema name to table names.
    schemas: BTreeMap<String, BTreeSet<String>>,
    web_categories: Vec<String>,
    executed: Vec<StatementKind>,
    scripts: Vec<String>,
    failing: HashSet<StatementKind>,
    hanging: HashSet<StatementKind>,
    refuse_connections: bool,
    connection_limit: Option<usize>,
    opened: usize,
    closed: usize,
    released: usize,
}

#[derive(Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

fn database_error(message: impl Into<String>) -> Error {
    Error::Database(sqlx::Error::Protocol(message.into()))
}

impl FakeDatabase {
    pub fn new() -> Self {
        let db = Self::default();
        db.state().schemas.insert("public".to_string(), BTreeSet::new());
        db
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn create_schema(&self, schema: &str) {
        self.state()
            .schemas
            .entry(schema.to_string())
            .or_default();
    }

    pub fn schema_exists(&self, schema: &str) -> bool {
        self.state().schemas.contains_key(schema)
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.state()
            .schemas
            .get(schema)
            .is_some_and(|tables| tables.contains(table))
    }

    pub fn add_category(&self, id: &str) {
        self.state().web_categories.push(id.to_string());
    }

    pub fn categories(&self) -> Vec<String> {
        self.state().web_categories.clone()
    }

    pub fn executed(&self) -> Vec<StatementKind> {
        self.state().executed.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state().scripts.clone()
    }

    pub fn fail_on(&self, kind: StatementKind) {
        self.state().failing.insert(kind);
    }

    pub fn hang_on(&self, kind: StatementKind) {
        self.state().hanging.insert(kind);
    }

    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    /// Accepts `limit` more sessions, then refuses like an unreachable server.
    pub fn refuse_connections_after(&self, limit: usize) {
        let mut state = self.state();
        state.connection_limit = Some(state.opened + limit);
    }

    pub fn opened(&self) -> usize {
        self.state().opened
    }

    /// Sessions closed through [`Session::close`].
    pub fn closed(&self) -> usize {
        self.state().closed
    }

    /// Sessions that are gone, closed or dropped.
    pub fn released(&self) -> usize {
        self.state().released
    }
}

#[async_trait]
impl Connector for FakeDatabase {
    async fn connect(&self) -> Result<Box<dyn Session>> {
        let mut state = self.state();
        let exhausted = state.connection_limit.is_some_and(|limit| state.opened >= limit);
        if state.refuse_connections || exhausted {
            return Err(Error::Database(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))));
        }
        state.opened += 1;
        Ok(Box::new(FakeSession {
            db: self.clone(),
            search_path: Vec::new(),
        }))
    }
}

struct FakeSession {
    db: FakeDatabase,
    search_path: Vec<String>,
}

impl FakeSession {
    fn apply(&mut self, statement: &Statement) -> Result<u64> {
        let mut state = self.db.state();
        if state.failing.contains(&statement.kind) {
            return Err(database_error(format!("{:?} rejected", statement.kind)));
        }
        state.executed.push(statement.kind);

        let schema = statement.schema.as_str();
        match statement.kind {
            StatementKind::CreateSchema => {
                if state.schemas.contains_key(schema) {
                    return Err(Error::SchemaExists(schema.to_string()));
                }
                state.schemas.insert(schema.to_string(), BTreeSet::new());
                Ok(0)
            }
            StatementKind::GrantAdminPrivileges => {
                if !state.schemas.contains_key(schema) {
                    return Err(database_error(format!("schema \"{schema}\" does not exist")));
                }
                Ok(0)
            }
            StatementKind::SetSearchPath => {
                self.search_path = vec![schema.to_string(), "public".to_string()];
                Ok(0)
            }
            StatementKind::DropSchema => {
                state.schemas.remove(schema);
                Ok(0)
            }
            StatementKind::DeleteBundleCategories => {
                let prefix = format!("{schema}-");
                let before = state.web_categories.len();
                state
                    .web_categories
                    .retain(|id| id != schema && !id.starts_with(&prefix));
                Ok((before - state.web_categories.len()) as u64)
            }
            StatementKind::SchemaExists => Ok(u64::from(state.schemas.contains_key(schema))),
        }
    }

    fn run(&mut self, script: &str) -> Result<()> {
        let mut state = self.db.state();
        if script.contains(FAILING_SCRIPT_MARKER) {
            return Err(database_error("syntax error at or near \"INVALID\""));
        }

        let mut created = Vec::new();
        for sql in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let words: Vec<&str> = sql.split_whitespace().collect();
            if words.len() < 3 || !words[0].eq_ignore_ascii_case("create") {
                continue;
            }
            if !words[1].eq_ignore_ascii_case("table") {
                continue;
            }
            let target = words[2].split('(').next().unwrap_or_default();
            let (schema, table) = match target.split_once('.') {
                Some((schema, table)) => (schema.to_string(), table.to_string()),
                None => {
                    let schema = self
                        .search_path
                        .iter()
                        .find(|s| state.schemas.contains_key(*s))
                        .cloned()
                        .unwrap_or_else(|| "public".to_string());
                    (schema, target.to_string())
                }
            };
            if !state.schemas.contains_key(&schema) {
                return Err(database_error(format!("schema \"{schema}\" does not exist")));
            }
            created.push((schema, table));
        }

        // A simple-query batch runs in one implicit transaction.
        for (schema, table) in created {
            state.schemas.entry(schema).or_default().insert(table);
        }
        state.scripts.push(script.to_string());
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.db.state().released += 1;
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let hang = self.db.state().hanging.contains(&statement.kind);
        if hang {
            std::future::pending::<()>().await;
        }
        self.apply(statement)
    }

    async fn run_script(&mut self, script: &str) -> Result<()> {
        if script.contains(HANGING_SCRIPT_MARKER) {
            std::future::pending::<()>().await;
        }
        self.run(script)
    }

    async fn schema_exists(&mut self, schema: &BundleName) -> Result<bool> {
        Ok(self.db.schema_exists(schema.as_str()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.db.state().closed += 1;
        Ok(())
    }
}

pub fn count(executed: &[StatementKind], kind: StatementKind) -> usize {
    executed.iter().filter(|k| **k == kind).count()
}
