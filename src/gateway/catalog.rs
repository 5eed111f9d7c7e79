//! Statements issued while provisioning bundles.
//!
//! Schema and role names cannot be bound as parameters, so they are only ever
//! taken from validated [`BundleName`]/[`RoleName`] values and double-quoted.
//! Everything else is bound.

use crate::types::{BundleName, RoleName};

pub const WEB_CATEGORIES_TABLE: &str = "public.web_categories";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateSchema,
    GrantAdminPrivileges,
    SetSearchPath,
    DropSchema,
    DeleteBundleCategories,
    SchemaExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub schema: BundleName,
    pub sql: String,
    pub binds: Vec<String>,
}

impl Statement {
    fn new(kind: StatementKind, schema: &BundleName, sql: String) -> Self {
        Self {
            kind,
            schema: schema.clone(),
            sql,
            binds: Vec::new(),
        }
    }

    fn bind(mut self, value: impl Into<String>) -> Self {
        self.binds.push(value.into());
        self
    }
}

pub fn create_schema(schema: &BundleName) -> Statement {
    Statement::new(
        StatementKind::CreateSchema,
        schema,
        format!("CREATE SCHEMA {}", schema.quoted()),
    )
}

/// Default privileges so the admin role can use every table and sequence the
/// bundle creates afterwards.
pub fn grant_admin_privileges(schema: &BundleName, role: &RoleName) -> Statement {
    let (s, r) = (schema.quoted(), role.quoted());
    Statement::new(
        StatementKind::GrantAdminPrivileges,
        schema,
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA {s} GRANT ALL ON TABLES TO {r}; \
             ALTER DEFAULT PRIVILEGES IN SCHEMA {s} GRANT USAGE ON SEQUENCES TO {r};"
        ),
    )
}

pub fn set_search_path(schema: &BundleName) -> Statement {
    Statement::new(
        StatementKind::SetSearchPath,
        schema,
        format!("SET search_path TO {}, public", schema.quoted()),
    )
}

pub fn drop_schema(schema: &BundleName) -> Statement {
    Statement::new(
        StatementKind::DropSchema,
        schema,
        format!("DROP SCHEMA IF EXISTS {} CASCADE", schema.quoted()),
    )
}

/// Categories owned by a bundle have an id equal to the bundle name or
/// prefixed with `<bundle>-`.
pub fn delete_bundle_categories(schema: &BundleName) -> Statement {
    Statement::new(
        StatementKind::DeleteBundleCategories,
        schema,
        format!(
            "DELETE FROM {WEB_CATEGORIES_TABLE} \
             WHERE id = $1 OR left(id, char_length($1) + 1) = $1 || '-'"
        ),
    )
    .bind(schema.as_str())
}

pub fn schema_exists(schema: &BundleName) -> Statement {
    Statement::new(
        StatementKind::SchemaExists,
        schema,
        "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)".to_string(),
    )
    .bind(schema.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> BundleName {
        BundleName::new("shop").unwrap()
    }

    #[test]
    fn test_create_and_drop_quote_schema() {
        assert_eq!(create_schema(&shop()).sql, "CREATE SCHEMA \"shop\"");
        assert_eq!(
            drop_schema(&shop()).sql,
            "DROP SCHEMA IF EXISTS \"shop\" CASCADE"
        );
    }

    #[test]
    fn test_grant_targets_role() {
        let role = RoleName::new("admin").unwrap();
        let stmt = grant_admin_privileges(&shop(), &role);
        assert_eq!(stmt.kind, StatementKind::GrantAdminPrivileges);
        assert_eq!(stmt.sql.matches("IN SCHEMA \"shop\"").count(), 2);
        assert!(stmt.sql.contains("GRANT ALL ON TABLES TO \"admin\""));
        assert!(stmt.sql.contains("GRANT USAGE ON SEQUENCES TO \"admin\""));
        assert!(stmt.binds.is_empty());
    }

    #[test]
    fn test_search_path_keeps_public() {
        assert_eq!(
            set_search_path(&shop()).sql,
            "SET search_path TO \"shop\", public"
        );
    }

    #[test]
    fn test_category_delete_binds_name() {
        let stmt = delete_bundle_categories(&shop());
        assert_eq!(stmt.binds, vec!["shop"]);
        assert!(!stmt.sql.contains("shop"));
    }

    #[test]
    fn test_schema_exists_binds_name() {
        let stmt = schema_exists(&shop());
        assert_eq!(stmt.kind, StatementKind::SchemaExists);
        assert_eq!(stmt.binds, vec!["shop"]);
    }
}
