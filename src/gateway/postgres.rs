//! PostgreSQL gateway on a single, unpooled sqlx connection.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Connection, Executor, Row};
use sqlx::postgres::{PgConnectOptions, PgConnection};

use super::catalog::{self, Statement, StatementKind};
use super::{Connector, Session};
use crate::error::{Error, Result};
use crate::types::BundleName;

/// SQLSTATE for `duplicate_schema`.
const DUPLICATE_SCHEMA: &str = "42P06";

pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    /// Builds a connector from a `postgres://` URL.
    ///
    /// `statement_timeout` is forwarded to the server so a stalled statement is
    /// aborted there as well as timed out locally.
    pub fn from_url(url: &str, statement_timeout: Option<Duration>) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(url)?;

        if let Some(timeout) = statement_timeout {
            options = options.options([(
                "statement_timeout",
                format!("{}ms", timeout.as_millis()),
            )]);
        }

        // Log connection info without password
        tracing::debug!(
            host = options.get_host(),
            port = options.get_port(),
            database = options.get_database().unwrap_or("<default>"),
            "Configured PostgreSQL connection"
        );

        Ok(Self { options })
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self) -> Result<Box<dyn Session>> {
        let conn = PgConnection::connect_with(&self.options).await?;
        Ok(Box::new(PgSession { conn }))
    }
}

struct PgSession {
    conn: PgConnection,
}

fn map_error(err: sqlx::Error, statement: &Statement) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if statement.kind == StatementKind::CreateSchema
            && db.code().as_deref() == Some(DUPLICATE_SCHEMA)
        {
            return Error::SchemaExists(statement.schema.to_string());
        }
    }
    Error::Database(err)
}

#[async_trait]
impl Session for PgSession {
    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let result = if statement.binds.is_empty() {
            // Simple query protocol: allows several statements in one call.
            (&mut self.conn).execute(sqlx::raw_sql(&statement.sql)).await
        } else {
            let mut query = sqlx::query(&statement.sql);
            for value in &statement.binds {
                query = query.bind(value.as_str());
            }
            (&mut self.conn).execute(query).await
        };

        result
            .map(|r| r.rows_affected())
            .map_err(|e| map_error(e, statement))
    }

    async fn run_script(&mut self, script: &str) -> Result<()> {
        (&mut self.conn).execute(sqlx::raw_sql(script)).await?;
        Ok(())
    }

    async fn schema_exists(&mut self, schema: &BundleName) -> Result<bool> {
        let statement = catalog::schema_exists(schema);
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.binds {
            query = query.bind(value.as_str());
        }
        (&mut self.conn)
            .fetch_one(query)
            .await
            .and_then(|row| row.try_get::<bool, _>(0))
            .map_err(|e| map_error(e, &statement))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
